//! Metadata builder and intermediate schema document
//!
//! Assembles parsed `TableMetadata` into `EntityDefinition`s and renders
//! the versioned schema document the generator and the consuming runtime
//! share. Field names in the serialized form are a contract: changes must
//! be additive and backward-compatible.

use serde::Serialize;

use crate::error::{CodegenError, Result};
use crate::naming;
use crate::table::TableMetadata;
use crate::types::{map_type, LogicalType};

pub const FORMAT_VERSION: u32 = 1;

/// The intermediate schema document. Entities are ordered by discovery,
/// properties by declaration, so re-serializing unchanged input is
/// byte-identical.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub format_version: u32,
    pub application: ApplicationInfo,
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub name: String,
    pub generator: String,
    pub generator_version: String,
}

/// One generated data-access type, derived 1:1 from a `TableMetadata`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub name: String,
    pub schema: String,
    pub table: String,
    /// Column name of the single-column primary key, when one exists.
    pub primary_key: Option<String>,
    pub properties: Vec<PropertyDef>,
    pub relationships: Vec<RelationshipDef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    pub name: String,
    pub column_name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub required: bool,
    pub identity: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expression: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDef {
    pub name: String,
    pub target_entity: String,
    pub foreign_key_column: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    ManyToOne,
    OneToMany,
}

impl SchemaDocument {
    pub fn to_json(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// Build the schema document from the complete table set. Relationship
/// naming needs global knowledge, so this runs only after the whole input
/// has been parsed.
pub fn build(tables: &[TableMetadata], application: &str) -> Result<SchemaDocument> {
    let mut entities: Vec<EntityDefinition> =
        tables.iter().map(build_entity).collect::<Result<_>>()?;

    for (index, table) in tables.iter().enumerate() {
        for fk in &table.foreign_keys {
            let target_index = resolve_foreign_key(tables, table, fk)?;

            let owner_name = entities[index].name.clone();
            let target_name = entities[target_index].name.clone();
            let stem = naming::column_stem(&fk.column_name);

            let owning_base = stem.clone().unwrap_or_else(|| target_name.clone());
            let owning_name = unique_name(&entities[index].relationships, owning_base);
            entities[index].relationships.push(RelationshipDef {
                name: owning_name,
                target_entity: target_name,
                foreign_key_column: fk.column_name.clone(),
                cardinality: Cardinality::ManyToOne,
            });

            let reverse_base = naming::pluralize(&owner_name);
            let reverse_candidate = if entities[target_index]
                .relationships
                .iter()
                .any(|r| r.name == reverse_base)
            {
                let via = stem.unwrap_or_else(|| naming::to_pascal_case(&fk.column_name));
                format!("{}Via{}", reverse_base, via)
            } else {
                reverse_base
            };
            let reverse_name = unique_name(&entities[target_index].relationships, reverse_candidate);
            entities[target_index].relationships.push(RelationshipDef {
                name: reverse_name,
                target_entity: owner_name,
                foreign_key_column: fk.column_name.clone(),
                cardinality: Cardinality::OneToMany,
            });
        }
    }

    Ok(SchemaDocument {
        format_version: FORMAT_VERSION,
        application: ApplicationInfo {
            name: application.to_string(),
            generator: "entity-codegen".to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        entities,
    })
}

fn build_entity(table: &TableMetadata) -> Result<EntityDefinition> {
    let entity_name = naming::to_pascal_case(&naming::singularize(&table.name));
    let mut properties = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let is_primary_key = table
            .primary_key_column
            .as_deref()
            .is_some_and(|pk| pk.eq_ignore_ascii_case(&column.name));
        let logical_type = map_type(
            &column.sql_type_name,
            column.max_length,
            column.precision,
            column.scale,
        )
        .ok_or_else(|| CodegenError::UnknownType {
            sql_type: column.sql_type_name.clone(),
            table: table.qualified_name(),
            column: column.name.clone(),
        })?;

        // Identity and primary key columns are never nullable, whatever the
        // declaration said.
        let nullable = column.is_nullable && !column.is_identity && !is_primary_key;
        properties.push(PropertyDef {
            name: naming::to_snake_case(&column.name),
            column_name: column.name.clone(),
            logical_type,
            nullable,
            required: !nullable,
            identity: column.is_identity,
            primary_key: is_primary_key,
            default_expression: column.default_expression.clone(),
        });
    }

    Ok(EntityDefinition {
        name: entity_name,
        schema: table.schema.clone(),
        table: table.name.clone(),
        primary_key: table.primary_key_column.clone(),
        properties,
        relationships: Vec::new(),
    })
}

/// Resolve a foreign key against the full table set, case-insensitively.
/// Returns the target table index; an unresolvable target or column is
/// fatal.
fn resolve_foreign_key(
    tables: &[TableMetadata],
    owner: &TableMetadata,
    fk: &crate::table::ForeignKeyMetadata,
) -> Result<usize> {
    let target_index = tables
        .iter()
        .position(|t| {
            t.schema.eq_ignore_ascii_case(&fk.referenced_schema)
                && t.name.eq_ignore_ascii_case(&fk.referenced_table)
        })
        .ok_or_else(|| CodegenError::UnresolvedForeignKey {
            table: owner.qualified_name(),
            column: fk.column_name.clone(),
            target: format!("{}.{}", fk.referenced_schema, fk.referenced_table),
        })?;

    let target = &tables[target_index];
    let referenced_column = if fk.referenced_column.is_empty() {
        target
            .primary_key_column
            .clone()
            .ok_or_else(|| CodegenError::UnresolvedForeignKey {
                table: owner.qualified_name(),
                column: fk.column_name.clone(),
                target: format!("{} (no primary key)", target.qualified_name()),
            })?
    } else {
        fk.referenced_column.clone()
    };
    if target.column(&referenced_column).is_none() {
        return Err(CodegenError::UnresolvedForeignKey {
            table: owner.qualified_name(),
            column: fk.column_name.clone(),
            target: format!("{}.{}", target.qualified_name(), referenced_column),
        });
    }
    Ok(target_index)
}

fn unique_name(existing: &[RelationshipDef], candidate: String) -> String {
    if !existing.iter().any(|r| r.name == candidate) {
        return candidate;
    }
    let mut n = 2;
    loop {
        let suffixed = format!("{}{}", candidate, n);
        if !existing.iter().any(|r| r.name == suffixed) {
            return suffixed;
        }
        n += 1;
    }
}
