//! Table metadata extracted from DDL

/// One `CREATE TABLE` statement with inline and table-level constraints
/// combined. Built once per parse pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    /// Single-column primary keys only; composite keys are reported as
    /// unsupported and leave this unset.
    pub primary_key_column: Option<String>,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
}

/// Column definition within a table. `sql_type_name` is the lowercased base
/// type name with length/precision/scale split out.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub sql_type_name: String,
    pub is_nullable: bool,
    pub is_identity: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub default_expression: Option<String>,
}

/// One foreign key from a column to a referenced table.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyMetadata {
    pub column_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    /// Empty when the DDL omitted the column list (`REFERENCES Categories`);
    /// resolved to the target table's primary key during metadata building.
    pub referenced_column: String,
}

impl TableMetadata {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Case-insensitive column lookup, matching SQL Server name semantics.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Create an example table for testing
    pub fn example() -> Self {
        Self {
            schema: "dbo".to_string(),
            name: "Products".to_string(),
            columns: vec![
                ColumnMetadata {
                    name: "Id".to_string(),
                    sql_type_name: "int".to_string(),
                    is_nullable: false,
                    is_identity: true,
                    max_length: None,
                    precision: None,
                    scale: None,
                    default_expression: None,
                },
                ColumnMetadata {
                    name: "Name".to_string(),
                    sql_type_name: "nvarchar".to_string(),
                    is_nullable: false,
                    is_identity: false,
                    max_length: Some(100),
                    precision: None,
                    scale: None,
                    default_expression: None,
                },
                ColumnMetadata {
                    name: "Price".to_string(),
                    sql_type_name: "decimal".to_string(),
                    is_nullable: true,
                    is_identity: false,
                    max_length: None,
                    precision: Some(18),
                    scale: Some(2),
                    default_expression: None,
                },
            ],
            primary_key_column: Some("Id".to_string()),
            foreign_keys: Vec::new(),
        }
    }
}
