//! entity-codegen
//!
//! SQL DDL to entity-definition code generation. The pipeline is strictly
//! linear - parse, visit, map types, build, serialize, generate - and each
//! later stage runs only once its predecessor's full output is available,
//! because relationship naming needs the complete table set.
//!
//! This generates actual Rust source files rather than using procedural
//! macros, so the output can be read, reviewed, and extended with manual
//! companion files.

pub mod error;
pub mod naming;
pub mod parser;
pub mod schema;
pub mod table;
pub mod types;
pub mod views;
pub mod writer;

pub use error::{CodegenError, Warning};
pub use schema::{build, EntityDefinition, SchemaDocument};
pub use table::{ColumnMetadata, ForeignKeyMetadata, TableMetadata};
pub use types::{map_type, LogicalType};
pub use views::ViewDefinition;
pub use writer::EntityWriter;
