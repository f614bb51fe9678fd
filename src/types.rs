//! Logical type mapping for SQL column types
//!
//! This module provides the dialect-independent type layer: a closed
//! `LogicalType` enum and the table-driven mapping from SQL type names
//! (e.g. "nvarchar", "decimal") onto it. The mapping is a pure function:
//! identical inputs always produce an identical `LogicalType`, including
//! precision, scale, and length.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// The pipeline's internal, SQL-dialect-independent column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LogicalType {
    Int16,
    Int32,
    Int64,
    Byte,
    Decimal { precision: u8, scale: u8 },
    Double,
    Single,
    Bool,
    Guid,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    /// `max_length` of `None` means unbounded (`NVARCHAR(MAX)`, `TEXT`).
    String { max_length: Option<u32> },
    Bytes,
}

impl LogicalType {
    /// Render the target-language type for generated code. Consumers of the
    /// generated sources supply chrono, uuid, and rust_decimal.
    pub fn rust_type(&self, nullable: bool) -> String {
        let base = match self {
            LogicalType::Int16 => "i16",
            LogicalType::Int32 => "i32",
            LogicalType::Int64 => "i64",
            LogicalType::Byte => "u8",
            LogicalType::Decimal { .. } => "rust_decimal::Decimal",
            LogicalType::Double => "f64",
            LogicalType::Single => "f32",
            LogicalType::Bool => "bool",
            LogicalType::Guid => "uuid::Uuid",
            LogicalType::Date => "chrono::NaiveDate",
            LogicalType::Time => "chrono::NaiveTime",
            LogicalType::DateTime => "chrono::NaiveDateTime",
            LogicalType::DateTimeOffset => "chrono::DateTime<chrono::FixedOffset>",
            LogicalType::String { .. } => "String",
            LogicalType::Bytes => "Vec<u8>",
        };
        if nullable {
            format!("Option<{}>", base)
        } else {
            base.to_string()
        }
    }
}

/// Map a lowercased SQL base type name to a logical type.
///
/// Returns `None` for unrecognized names; the caller attaches table/column
/// context and turns that into a fatal `UnknownType` error.
pub fn map_type(
    sql_type_name: &str,
    max_length: Option<u32>,
    precision: Option<u8>,
    scale: Option<u8>,
) -> Option<LogicalType> {
    let mapped = match sql_type_name.to_lowercase().as_str() {
        "tinyint" => LogicalType::Byte,
        "smallint" => LogicalType::Int16,
        "int" | "integer" => LogicalType::Int32,
        "bigint" => LogicalType::Int64,
        "decimal" | "numeric" => LogicalType::Decimal {
            precision: precision.unwrap_or(18),
            scale: scale.unwrap_or(0),
        },
        "money" => LogicalType::Decimal {
            precision: 19,
            scale: 4,
        },
        "smallmoney" => LogicalType::Decimal {
            precision: 10,
            scale: 4,
        },
        "float" => LogicalType::Double,
        "real" => LogicalType::Single,
        "date" => LogicalType::Date,
        "time" => LogicalType::Time,
        "datetime" | "datetime2" | "smalldatetime" => LogicalType::DateTime,
        "datetimeoffset" => LogicalType::DateTimeOffset,
        "bit" => LogicalType::Bool,
        "uniqueidentifier" => LogicalType::Guid,
        "varchar" | "nvarchar" | "char" | "nchar" | "character" | "character varying" => {
            LogicalType::String { max_length }
        }
        "text" | "ntext" => LogicalType::String { max_length: None },
        "varbinary" | "binary" | "image" => LogicalType::Bytes,
        // Opaque passthrough types the generator carries as text.
        "xml" | "geography" | "geometry" | "hierarchyid" | "sql_variant" => {
            LogicalType::String { max_length: None }
        }
        _ => return None,
    };
    Some(mapped)
}

static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*([a-z_][a-z0-9_ ]*?)\s*(?:\(\s*([^)]*?)\s*\))?\s*$").unwrap());

/// Split a rendered SQL type ("NVARCHAR(100)", "DECIMAL(18,2)",
/// "VARCHAR(MAX)") into its lowercased base name and length /
/// precision / scale arguments. A single numeric argument is surfaced as
/// both length and precision; the mapping table picks whichever applies to
/// the type family. `MAX` yields no length (unbounded).
pub fn parse_sql_type(sql_type: &str) -> (String, Option<u32>, Option<u8>, Option<u8>) {
    let caps = match TYPE_RE.captures(sql_type) {
        Some(caps) => caps,
        None => return (sql_type.trim().to_lowercase(), None, None, None),
    };
    let base = caps[1].trim().to_lowercase();
    let mut max_length = None;
    let mut precision = None;
    let mut scale = None;
    if let Some(args) = caps.get(2) {
        let parts: Vec<&str> = args.as_str().split(',').map(str::trim).collect();
        match parts.as_slice() {
            [one] if one.eq_ignore_ascii_case("max") => {}
            [one] => {
                if let Ok(n) = one.parse::<u32>() {
                    max_length = Some(n);
                    precision = u8::try_from(n).ok();
                }
            }
            [p, s] => {
                precision = p.parse::<u8>().ok();
                scale = s.parse::<u8>().ok();
            }
            _ => {}
        }
    }
    (base, max_length, precision, scale)
}

/// Map a rendered SQL type string in one step, as the view registry does.
pub fn map_sql_type(sql_type: &str) -> Option<LogicalType> {
    let (base, max_length, precision, scale) = parse_sql_type(sql_type);
    map_type(&base, max_length, precision, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_family() {
        assert_eq!(map_type("tinyint", None, None, None), Some(LogicalType::Byte));
        assert_eq!(map_type("smallint", None, None, None), Some(LogicalType::Int16));
        assert_eq!(map_type("int", None, None, None), Some(LogicalType::Int32));
        assert_eq!(map_type("bigint", None, None, None), Some(LogicalType::Int64));
    }

    #[test]
    fn decimal_preserves_precision_and_scale() {
        assert_eq!(
            map_type("decimal", None, Some(18), Some(2)),
            Some(LogicalType::Decimal {
                precision: 18,
                scale: 2
            })
        );
        // Defaults match SQL Server's DECIMAL defaults.
        assert_eq!(
            map_type("numeric", None, None, None),
            Some(LogicalType::Decimal {
                precision: 18,
                scale: 0
            })
        );
        assert_eq!(
            map_type("money", None, None, None),
            Some(LogicalType::Decimal {
                precision: 19,
                scale: 4
            })
        );
    }

    #[test]
    fn character_family_keeps_length() {
        assert_eq!(
            map_sql_type("NVARCHAR(100)"),
            Some(LogicalType::String {
                max_length: Some(100)
            })
        );
        assert_eq!(
            map_sql_type("VARCHAR(MAX)"),
            Some(LogicalType::String { max_length: None })
        );
        assert_eq!(
            map_sql_type("xml"),
            Some(LogicalType::String { max_length: None })
        );
    }

    #[test]
    fn date_time_family() {
        assert_eq!(map_sql_type("datetime2(7)"), Some(LogicalType::DateTime));
        assert_eq!(
            map_sql_type("DATETIMEOFFSET"),
            Some(LogicalType::DateTimeOffset)
        );
        assert_eq!(map_sql_type("time(3)"), Some(LogicalType::Time));
    }

    #[test]
    fn unknown_type_is_none() {
        assert_eq!(map_type("fancytype", None, None, None), None);
    }

    #[test]
    fn mapping_is_referentially_transparent() {
        let first = map_sql_type("DECIMAL(18,2)");
        let second = map_sql_type("DECIMAL(18,2)");
        assert_eq!(first, second);
    }

    #[test]
    fn rust_types_follow_nullability() {
        let name = LogicalType::String {
            max_length: Some(100),
        };
        assert_eq!(name.rust_type(false), "String");
        assert_eq!(name.rust_type(true), "Option<String>");
        let price = LogicalType::Decimal {
            precision: 18,
            scale: 2,
        };
        assert_eq!(price.rust_type(true), "Option<rust_decimal::Decimal>");
    }
}
