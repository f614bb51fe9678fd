//! Metadata builder tests: TableMetadata to schema document

use entity_codegen::error::CodegenError;
use entity_codegen::parser::parse;
use entity_codegen::schema::{build, Cardinality, SchemaDocument};
use entity_codegen::types::LogicalType;

fn build_from(sql: &str) -> SchemaDocument {
    let output = parse(sql).unwrap();
    build(&output.tables, "test").unwrap()
}

#[test]
fn products_categories_end_to_end() {
    let sql = "CREATE TABLE Categories (Id INT IDENTITY(1,1) PRIMARY KEY, Name NVARCHAR(50) NOT NULL);
        CREATE TABLE Products (
            Id INT PRIMARY KEY IDENTITY(1,1),
            Name NVARCHAR(100) NOT NULL,
            CategoryId INT NULL,
            FOREIGN KEY (CategoryId) REFERENCES Categories(Id)
        );";
    let document = build_from(sql);
    assert_eq!(document.entities.len(), 2);

    let product = document.entities.iter().find(|e| e.name == "Product").unwrap();
    assert_eq!(product.table, "Products");
    assert_eq!(product.primary_key.as_deref(), Some("Id"));

    let id = &product.properties[0];
    assert_eq!(id.name, "id");
    assert_eq!(id.logical_type, LogicalType::Int32);
    assert!(id.identity);
    assert!(id.primary_key);
    assert!(!id.nullable);

    let name = &product.properties[1];
    assert_eq!(name.name, "name");
    assert_eq!(
        name.logical_type,
        LogicalType::String {
            max_length: Some(100)
        }
    );
    assert!(!name.nullable);
    assert!(name.required);

    let category_id = &product.properties[2];
    assert_eq!(category_id.name, "category_id");
    assert_eq!(category_id.logical_type, LogicalType::Int32);
    assert!(category_id.nullable);

    // Exactly one relationship to Category on the owning side.
    assert_eq!(product.relationships.len(), 1);
    let rel = &product.relationships[0];
    assert_eq!(rel.name, "Category");
    assert_eq!(rel.target_entity, "Category");
    assert_eq!(rel.foreign_key_column, "CategoryId");
    assert_eq!(rel.cardinality, Cardinality::ManyToOne);

    // And the reverse collection on the referenced side.
    let category = document.entities.iter().find(|e| e.name == "Category").unwrap();
    assert_eq!(category.relationships.len(), 1);
    let reverse = &category.relationships[0];
    assert_eq!(reverse.name, "Products");
    assert_eq!(reverse.target_entity, "Product");
    assert_eq!(reverse.cardinality, Cardinality::OneToMany);
}

#[test]
fn decimal_metadata_survives_to_property() {
    let document = build_from("CREATE TABLE Items (Id INT NOT NULL, Price DECIMAL(18,2) NULL);");
    let price = &document.entities[0].properties[1];
    assert_eq!(
        price.logical_type,
        LogicalType::Decimal {
            precision: 18,
            scale: 2
        }
    );
    assert!(price.nullable);
    assert!(!price.required);
}

#[test]
fn identity_column_is_never_nullable() {
    let document = build_from("CREATE TABLE T (Id INT IDENTITY(1,1), Label NVARCHAR(20) NULL);");
    let id = &document.entities[0].properties[0];
    assert!(id.identity);
    assert!(!id.nullable);
    let label = &document.entities[0].properties[1];
    assert!(label.nullable);
}

#[test]
fn two_foreign_keys_to_same_target_get_distinct_names() {
    let sql = "CREATE TABLE Addresses (Id INT IDENTITY(1,1) PRIMARY KEY, City NVARCHAR(50) NOT NULL);
        CREATE TABLE Orders (
            Id INT IDENTITY(1,1) PRIMARY KEY,
            ShippingAddressId INT NOT NULL,
            BillingAddressId INT NOT NULL,
            FOREIGN KEY (ShippingAddressId) REFERENCES Addresses(Id),
            FOREIGN KEY (BillingAddressId) REFERENCES Addresses(Id)
        );";
    let document = build_from(sql);

    let order = document.entities.iter().find(|e| e.name == "Order").unwrap();
    let names: Vec<&str> = order.relationships.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["ShippingAddress", "BillingAddress"]);

    let address = document.entities.iter().find(|e| e.name == "Address").unwrap();
    assert_eq!(address.relationships.len(), 2);
    let reverse_names: Vec<&str> = address
        .relationships
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(reverse_names.len(), 2);
    assert_ne!(reverse_names[0], reverse_names[1]);
}

#[test]
fn bare_references_resolve_to_target_primary_key() {
    let sql = "CREATE TABLE Categories (Id INT IDENTITY(1,1) PRIMARY KEY);
        CREATE TABLE Products (Id INT NOT NULL, CategoryId INT REFERENCES Categories);";
    let document = build_from(sql);
    let product = document.entities.iter().find(|e| e.name == "Product").unwrap();
    assert_eq!(product.relationships.len(), 1);
    assert_eq!(product.relationships[0].target_entity, "Category");
}

#[test]
fn unresolved_foreign_key_is_fatal() {
    let sql = "CREATE TABLE Products (Id INT NOT NULL, CategoryId INT NULL,
        FOREIGN KEY (CategoryId) REFERENCES Categories(Id));";
    let output = parse(sql).unwrap();
    let result = build(&output.tables, "test");
    assert!(matches!(
        result,
        Err(CodegenError::UnresolvedForeignKey { .. })
    ));
}

#[test]
fn unknown_type_is_fatal_with_context() {
    let output = parse("CREATE TABLE T (Id INT NOT NULL, Weird FOOBAR NULL);").unwrap();
    let result = build(&output.tables, "test");
    match result {
        Err(CodegenError::UnknownType {
            sql_type,
            table,
            column,
        }) => {
            assert_eq!(sql_type, "foobar");
            assert_eq!(table, "dbo.T");
            assert_eq!(column, "Weird");
        }
        other => panic!("expected UnknownType, got {:?}", other.err()),
    }
}

#[test]
fn serialization_is_deterministic() {
    let sql = "CREATE TABLE Categories (Id INT IDENTITY(1,1) PRIMARY KEY);
        CREATE TABLE Products (Id INT NOT NULL, CategoryId INT REFERENCES Categories(Id));";
    let first = build_from(sql).to_json().unwrap();
    let second = build_from(sql).to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn schema_document_field_names_are_the_contract() {
    let rendered = build_from(
        "CREATE TABLE Products (Id INT IDENTITY(1,1) PRIMARY KEY, Name NVARCHAR(100) NOT NULL);",
    )
    .to_json()
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["formatVersion"], 1);
    assert_eq!(value["application"]["generator"], "entity-codegen");
    let entity = &value["entities"][0];
    assert_eq!(entity["name"], "Product");
    assert_eq!(entity["primaryKey"], "Id");
    let name = &entity["properties"][1];
    assert_eq!(name["columnName"], "Name");
    assert_eq!(name["logicalType"]["kind"], "string");
    assert_eq!(name["logicalType"]["maxLength"], 100);
    assert_eq!(name["nullable"], false);
    assert_eq!(name["required"], true);
}
