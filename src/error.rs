//! Error and warning types for the generation pipeline

use thiserror::Error;

/// Fatal pipeline errors.
///
/// `Generation` is the one exception to fail-fast: it is scoped to a single
/// entity or view, collected into a report, and surfaced after the rest of
/// the run has completed.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Malformed DDL. The message carries the parser's line/column report.
    #[error("SQL parse error: {message}")]
    Parse { message: String },

    /// A column's SQL type has no logical type mapping.
    #[error("unknown SQL type '{sql_type}' on {table}.{column}")]
    UnknownType {
        sql_type: String,
        table: String,
        column: String,
    },

    /// A foreign key references a table or column that was never parsed.
    #[error("foreign key {table}.{column} references unknown {target}")]
    UnresolvedForeignKey {
        table: String,
        column: String,
        target: String,
    },

    /// Schema document rendering failure.
    #[error("failed to serialize schema document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generation failure scoped to one entity or view.
    #[error("generation failed for {entity}: {reason}")]
    Generation { entity: String, reason: String },

    /// The view registry document itself is unusable.
    #[error("invalid view registry: {message}")]
    Registry { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodegenError>;

/// Non-fatal diagnostics emitted during parsing.
///
/// Every skipped construct carries enough context to locate it; none of
/// these abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A recognized but unsupported construct (CHECK, UNIQUE, computed
    /// columns, composite keys) that is not represented in the model.
    UnsupportedConstruct {
        construct: String,
        table: String,
        column: Option<String>,
    },
    /// A statement kind the pipeline does not consume.
    SkippedStatement { kind: String },
    /// The same table was defined more than once; the later definition won.
    DuplicateTable { schema: String, table: String },
    /// A column attribute with no counterpart in the model.
    IgnoredAttribute {
        attribute: String,
        table: String,
        column: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnsupportedConstruct {
                construct,
                table,
                column: Some(column),
            } => {
                write!(
                    f,
                    "skipped unsupported {} on {}.{}",
                    construct, table, column
                )
            }
            Warning::UnsupportedConstruct {
                construct,
                table,
                column: None,
            } => {
                write!(f, "skipped unsupported {} on {}", construct, table)
            }
            Warning::SkippedStatement { kind } => {
                write!(f, "skipped statement: {}", kind)
            }
            Warning::DuplicateTable { schema, table } => {
                write!(
                    f,
                    "table {}.{} defined more than once; the later definition wins",
                    schema, table
                )
            }
            Warning::IgnoredAttribute {
                attribute,
                table,
                column,
            } => {
                write!(f, "ignored attribute '{}' on {}.{}", attribute, table, column)
            }
        }
    }
}
