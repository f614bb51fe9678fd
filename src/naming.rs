//! Name normalization across the schema/codegen boundary
//!
//! Every place a table or column name becomes an entity, property, module,
//! or relationship name goes through here, so the convention stays
//! consistent end to end.

/// Convert an identifier to snake_case. Runs of uppercase letters are kept
/// together (`ProductID` -> `product_id`).
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && chars[i - 1] != '_' && (prev_lower || next_lower) {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(*c);
        }
    }
    result
}

/// Convert an identifier to PascalCase. Already-Pascal input passes through
/// unchanged.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c| c == '_' || c == ' ' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Heuristic English singularization used to derive entity names from table
/// names (`Products` -> `Product`, `Categories` -> `Category`).
pub fn singularize(s: &str) -> String {
    if !s.is_ascii() || s.len() < 2 {
        return s.to_string();
    }
    let lower = s.to_lowercase();
    if lower.ends_with("ies") && s.len() > 3 {
        return format!("{}y", &s[..s.len() - 3]);
    }
    if (lower.ends_with("ches")
        || lower.ends_with("shes")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
        || lower.ends_with("sses"))
        && s.len() > 4
    {
        return s[..s.len() - 2].to_string();
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return s[..s.len() - 1].to_string();
    }
    s.to_string()
}

/// Heuristic English pluralization, the inverse convention the consuming
/// runtime relies on for entity name -> table name resolution.
pub fn pluralize(s: &str) -> String {
    if !s.is_ascii() || s.is_empty() {
        return s.to_string();
    }
    let lower = s.to_lowercase();
    if lower.ends_with('y') && s.len() > 1 {
        let before = s.as_bytes()[s.len() - 2].to_ascii_lowercase() as char;
        if !matches!(before, 'a' | 'e' | 'i' | 'o' | 'u') {
            return format!("{}ies", &s[..s.len() - 1]);
        }
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", s);
    }
    format!("{}s", s)
}

/// Strip a foreign-key column down to its relationship stem:
/// `CategoryId` -> `Category`, `parent_id` -> `Parent`. Returns `None` when
/// nothing is left after stripping (the column is literally `Id`).
pub fn column_stem(column: &str) -> Option<String> {
    let stripped = column
        .strip_suffix("_id")
        .or_else(|| column.strip_suffix("_ID"))
        .or_else(|| column.strip_suffix("_Id"))
        .or_else(|| column.strip_suffix("Id"))
        .or_else(|| column.strip_suffix("ID"))?;
    if stripped.is_empty() {
        None
    } else {
        Some(to_pascal_case(stripped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_acronym_runs() {
        assert_eq!(to_snake_case("CategoryId"), "category_id");
        assert_eq!(to_snake_case("ProductID"), "product_id");
        assert_eq!(to_snake_case("ABCCode"), "abc_code");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn pascal_case_round_trips() {
        assert_eq!(to_pascal_case("category_id"), "CategoryId");
        assert_eq!(to_pascal_case("CategoryId"), "CategoryId");
        assert_eq!(to_pascal_case("order line"), "OrderLine");
    }

    #[test]
    fn singularize_common_forms() {
        assert_eq!(singularize("Products"), "Product");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(singularize("Boxes"), "Box");
        assert_eq!(singularize("Address"), "Address");
        assert_eq!(singularize("Person"), "Person");
    }

    #[test]
    fn pluralize_common_forms() {
        assert_eq!(pluralize("Product"), "Products");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Day"), "Days");
    }

    #[test]
    fn column_stem_strips_id_suffixes() {
        assert_eq!(column_stem("CategoryId").as_deref(), Some("Category"));
        assert_eq!(column_stem("parent_id").as_deref(), Some("Parent"));
        assert_eq!(column_stem("Id"), None);
        assert_eq!(column_stem("Name"), None);
    }
}
