//! Read-only view projections
//!
//! Views are declared in a TOML registry pointing at hand-written `SELECT`
//! statements; result columns are declared in the registry, not inferred
//! from the SQL. A view carries no primary key, no relationships, and no
//! validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sqlparser::ast::Statement;
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{CodegenError, Result};
use crate::types::{map_sql_type, LogicalType};

#[derive(Debug, Deserialize)]
struct RegistryDoc {
    #[serde(default)]
    view: Vec<ViewEntry>,
}

#[derive(Debug, Deserialize)]
struct ViewEntry {
    name: String,
    sql_file: PathBuf,
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    sql_type: String,
    #[serde(default)]
    nullable: bool,
}

/// A read-only projection: declared result columns plus the SQL that
/// produces them.
#[derive(Debug, Clone)]
pub struct ViewDefinition {
    pub name: String,
    pub sql_source: String,
    pub result_columns: Vec<ViewColumn>,
}

#[derive(Debug, Clone)]
pub struct ViewColumn {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

/// Load the registry. An unreadable registry document is fatal; problems
/// with an individual view are isolated so one bad view does not block the
/// others.
pub fn load_registry(path: &Path) -> Result<(Vec<ViewDefinition>, Vec<CodegenError>)> {
    let text = fs::read_to_string(path)?;
    let doc: RegistryDoc = toml::from_str(&text).map_err(|e| CodegenError::Registry {
        message: e.to_string(),
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut views = Vec::new();
    let mut failures = Vec::new();
    for entry in doc.view {
        match load_view(&entry, base) {
            Ok(view) => views.push(view),
            Err(e) => failures.push(e),
        }
    }
    Ok((views, failures))
}

fn load_view(entry: &ViewEntry, base: &Path) -> Result<ViewDefinition> {
    let sql_path = if entry.sql_file.is_absolute() {
        entry.sql_file.clone()
    } else {
        base.join(&entry.sql_file)
    };
    let sql_source = fs::read_to_string(&sql_path).map_err(|e| CodegenError::Generation {
        entity: entry.name.clone(),
        reason: format!("cannot read {}: {}", sql_path.display(), e),
    })?;

    let statements =
        Parser::parse_sql(&MsSqlDialect {}, &sql_source).map_err(|e| CodegenError::Generation {
            entity: entry.name.clone(),
            reason: format!("invalid SQL: {}", e),
        })?;
    match statements.as_slice() {
        [Statement::Query(_)] => {}
        _ => {
            return Err(CodegenError::Generation {
                entity: entry.name.clone(),
                reason: "view source must contain exactly one SELECT statement".to_string(),
            })
        }
    }

    let mut result_columns = Vec::with_capacity(entry.columns.len());
    for column in &entry.columns {
        let logical_type =
            map_sql_type(&column.sql_type).ok_or_else(|| CodegenError::Generation {
                entity: entry.name.clone(),
                reason: format!(
                    "unknown SQL type '{}' for column {}",
                    column.sql_type, column.name
                ),
            })?;
        result_columns.push(ViewColumn {
            name: column.name.clone(),
            logical_type,
            nullable: column.nullable,
        });
    }

    Ok(ViewDefinition {
        name: entry.name.clone(),
        sql_source: sql_source.trim().to_string(),
        result_columns,
    })
}
