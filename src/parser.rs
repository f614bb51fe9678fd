//! DDL parsing and table extraction
//!
//! Turns raw SQL text into `TableMetadata` records. Parsing is delegated to
//! `sqlparser` with the MsSql dialect; only `CREATE SCHEMA` and
//! `CREATE TABLE` are consumed, every other statement kind is reported as a
//! skipped statement. Malformed SQL aborts the run with zero output.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{
    ColumnDef, ColumnOption, CreateTable, ObjectName, Statement, TableConstraint,
};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{CodegenError, Result, Warning};
use crate::table::{ColumnMetadata, ForeignKeyMetadata, TableMetadata};
use crate::types::parse_sql_type;

const DEFAULT_SCHEMA: &str = "dbo";

/// T-SQL batch separators are not part of the grammar; turn each `GO` line
/// into a statement separator before parsing.
static GO_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*GO[ \t]*;?[ \t]*$").unwrap());

/// Result of one parse pass: every table discovered, in discovery order,
/// plus non-fatal diagnostics.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub tables: Vec<TableMetadata>,
    pub warnings: Vec<Warning>,
}

/// Parse one DDL document.
pub fn parse(sql_text: &str) -> Result<ParseOutput> {
    let mut output = ParseOutput::default();
    parse_into(sql_text, &mut output)?;
    Ok(output)
}

/// Parse a `.sql` file, or a directory of `.sql` files in lexicographic
/// order so discovery order is deterministic across runs.
pub fn parse_file(path: &Path) -> Result<ParseOutput> {
    let mut output = ParseOutput::default();
    if path.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(path)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("sql"))
            .collect();
        entries.sort();
        for entry in entries {
            let text = fs::read_to_string(&entry)?;
            parse_into(&text, &mut output)?;
        }
    } else {
        let text = fs::read_to_string(path)?;
        parse_into(&text, &mut output)?;
    }
    Ok(output)
}

/// Parse one document into an existing output, so multiple input files
/// share duplicate-table handling.
pub fn parse_into(sql_text: &str, output: &mut ParseOutput) -> Result<()> {
    let prepared = GO_SEPARATOR.replace_all(sql_text, ";");
    let statements = Parser::parse_sql(&MsSqlDialect {}, &prepared)
        .map_err(|e| CodegenError::Parse {
            message: e.to_string(),
        })?;
    log::debug!("parsed {} statement(s)", statements.len());

    for statement in statements {
        match statement {
            Statement::CreateTable(create) => visit_create_table(create, output),
            Statement::CreateSchema { .. } => {
                // Schemas carry no metadata of their own; table names arrive
                // already schema-qualified.
            }
            other => {
                output.warnings.push(Warning::SkippedStatement {
                    kind: statement_kind(&other),
                });
            }
        }
    }
    Ok(())
}

/// Label an ignored statement by its leading keywords.
fn statement_kind(statement: &Statement) -> String {
    let rendered = statement.to_string();
    let mut words = rendered.split_whitespace();
    let first = words.next().unwrap_or("statement").to_uppercase();
    match words.next() {
        Some(second) if second.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("{} {}", first, second.to_uppercase())
        }
        _ => first,
    }
}

fn visit_create_table(create: CreateTable, output: &mut ParseOutput) {
    let (schema, name) = split_object_name(&create.name);
    let mut table = TableMetadata {
        schema,
        name,
        columns: Vec::with_capacity(create.columns.len()),
        primary_key_column: None,
        foreign_keys: Vec::new(),
    };

    for column in &create.columns {
        visit_column(column, &mut table, &mut output.warnings);
    }
    for constraint in &create.constraints {
        visit_table_constraint(constraint, &mut table, &mut output.warnings);
    }

    let existing = output.tables.iter_mut().find(|t| {
        t.schema.eq_ignore_ascii_case(&table.schema) && t.name.eq_ignore_ascii_case(&table.name)
    });
    match existing {
        Some(previous) => {
            // Later definition wins, in place.
            output.warnings.push(Warning::DuplicateTable {
                schema: table.schema.clone(),
                table: table.name.clone(),
            });
            *previous = table;
        }
        None => output.tables.push(table),
    }
}

fn visit_column(column: &ColumnDef, table: &mut TableMetadata, warnings: &mut Vec<Warning>) {
    let column_name = column.name.value.clone();
    let (sql_type_name, max_length, precision, scale) =
        parse_sql_type(&column.data_type.to_string());

    let mut meta = ColumnMetadata {
        name: column_name.clone(),
        sql_type_name,
        is_nullable: true,
        is_identity: false,
        max_length,
        precision,
        scale,
        default_expression: None,
    };
    let mut is_primary = false;

    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull => meta.is_nullable = false,
            ColumnOption::Null => meta.is_nullable = true,
            ColumnOption::Default(expr) => meta.default_expression = Some(expr.to_string()),
            ColumnOption::Identity(_) => meta.is_identity = true,
            ColumnOption::Unique {
                is_primary: true, ..
            } => is_primary = true,
            ColumnOption::Unique { .. } => warnings.push(Warning::UnsupportedConstruct {
                construct: "UNIQUE constraint".to_string(),
                table: table.name.clone(),
                column: Some(column_name.clone()),
            }),
            ColumnOption::Check(_) => warnings.push(Warning::UnsupportedConstruct {
                construct: "CHECK constraint".to_string(),
                table: table.name.clone(),
                column: Some(column_name.clone()),
            }),
            ColumnOption::Generated { .. } => warnings.push(Warning::UnsupportedConstruct {
                construct: "computed column".to_string(),
                table: table.name.clone(),
                column: Some(column_name.clone()),
            }),
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                ..
            } => {
                let (referenced_schema, referenced_table) = split_object_name(foreign_table);
                table.foreign_keys.push(ForeignKeyMetadata {
                    column_name: column_name.clone(),
                    referenced_schema,
                    referenced_table,
                    referenced_column: referred_columns
                        .first()
                        .map(|c| c.value.clone())
                        .unwrap_or_default(),
                });
            }
            other => warnings.push(Warning::IgnoredAttribute {
                attribute: other.to_string(),
                table: table.name.clone(),
                column: column_name.clone(),
            }),
        }
    }

    if meta.is_identity {
        meta.is_nullable = false;
    }
    if is_primary {
        if table.primary_key_column.is_some() {
            warnings.push(Warning::UnsupportedConstruct {
                construct: "composite PRIMARY KEY".to_string(),
                table: table.name.clone(),
                column: Some(column_name.clone()),
            });
        } else {
            meta.is_nullable = false;
            table.primary_key_column = Some(column_name);
        }
    }
    table.columns.push(meta);
}

fn visit_table_constraint(
    constraint: &TableConstraint,
    table: &mut TableMetadata,
    warnings: &mut Vec<Warning>,
) {
    match constraint {
        TableConstraint::PrimaryKey { columns, .. } => {
            if columns.len() != 1 {
                warnings.push(Warning::UnsupportedConstruct {
                    construct: "composite PRIMARY KEY".to_string(),
                    table: table.name.clone(),
                    column: None,
                });
                return;
            }
            let column_name = columns[0].value.clone();
            match &table.primary_key_column {
                Some(existing) if existing.eq_ignore_ascii_case(&column_name) => {}
                Some(_) => warnings.push(Warning::UnsupportedConstruct {
                    construct: "composite PRIMARY KEY".to_string(),
                    table: table.name.clone(),
                    column: Some(column_name),
                }),
                None => {
                    if let Some(col) = table
                        .columns
                        .iter_mut()
                        .find(|c| c.name.eq_ignore_ascii_case(&column_name))
                    {
                        col.is_nullable = false;
                    }
                    table.primary_key_column = Some(column_name);
                }
            }
        }
        TableConstraint::ForeignKey {
            columns,
            foreign_table,
            referred_columns,
            ..
        } => {
            if columns.len() != 1 {
                warnings.push(Warning::UnsupportedConstruct {
                    construct: "composite FOREIGN KEY".to_string(),
                    table: table.name.clone(),
                    column: None,
                });
                return;
            }
            let (referenced_schema, referenced_table) = split_object_name(foreign_table);
            table.foreign_keys.push(ForeignKeyMetadata {
                column_name: columns[0].value.clone(),
                referenced_schema,
                referenced_table,
                referenced_column: referred_columns
                    .first()
                    .map(|c| c.value.clone())
                    .unwrap_or_default(),
            });
        }
        TableConstraint::Unique { .. } => warnings.push(Warning::UnsupportedConstruct {
            construct: "UNIQUE constraint".to_string(),
            table: table.name.clone(),
            column: None,
        }),
        TableConstraint::Check { .. } => warnings.push(Warning::UnsupportedConstruct {
            construct: "CHECK constraint".to_string(),
            table: table.name.clone(),
            column: None,
        }),
        other => warnings.push(Warning::UnsupportedConstruct {
            construct: other.to_string(),
            table: table.name.clone(),
            column: None,
        }),
    }
}

/// Split a possibly schema-qualified object name, defaulting to `dbo`.
fn split_object_name(name: &ObjectName) -> (String, String) {
    let parts: Vec<String> = name.0.iter().map(|part| part.value.clone()).collect();
    match parts.len() {
        0 => (DEFAULT_SCHEMA.to_string(), String::new()),
        1 => (DEFAULT_SCHEMA.to_string(), parts[0].clone()),
        2 => (parts[0].clone(), parts[1].clone()),
        // database.schema.table
        _ => (
            parts[parts.len() - 2].clone(),
            parts[parts.len() - 1].clone(),
        ),
    }
}
