//! Code generation writer
//!
//! Emits one self-contained Rust source file per entity or view, plus the
//! manifest module the consuming runtime enumerates. Generated files are
//! build artifacts, fully overwritten on every run; files matching the
//! manual-extension pattern are never written.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use regex::Regex;

use crate::error::{CodegenError, Result};
use crate::naming;
use crate::schema::{Cardinality, EntityDefinition, SchemaDocument};
use crate::types::LogicalType;
use crate::views::ViewDefinition;

/// Files matching this pattern belong to humans. Ownership is decided by
/// file name alone; contents are never inspected.
static MANUAL_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+_manual\.rs$").unwrap());

pub fn is_manual_file(file_name: &str) -> bool {
    MANUAL_FILE.is_match(file_name)
}

pub struct EntityWriter;

impl Default for EntityWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityWriter {
    pub fn new() -> Self {
        Self
    }

    /// Generate the complete source file for one entity.
    pub fn generate_entity_code(&self, entity: &EntityDefinition) -> Result<String> {
        let struct_ident = ident(&entity.name);
        let qualified_table = format!("{}.{}", entity.schema, entity.table);

        let mut field_tokens = Vec::with_capacity(entity.properties.len());
        for property in &entity.properties {
            let field = ident(&property.name);
            let ty = type_tokens(
                &property.logical_type.rust_type(property.nullable),
                &entity.name,
            )?;
            field_tokens.push(quote! { pub #field: #ty, });
        }

        let column_variants: Vec<Ident> = entity
            .properties
            .iter()
            .map(|p| ident(&naming::to_pascal_case(&p.name)))
            .collect();
        let column_names: Vec<&str> = entity
            .properties
            .iter()
            .map(|p| p.column_name.as_str())
            .collect();

        let length_checks = self.length_checks(entity);
        let relationship_entries = entity.relationships.iter().map(|rel| {
            let name = rel.name.as_str();
            let target = rel.target_entity.as_str();
            let fk = rel.foreign_key_column.as_str();
            let cardinality = match rel.cardinality {
                Cardinality::ManyToOne => quote!(super::Cardinality::ManyToOne),
                Cardinality::OneToMany => quote!(super::Cardinality::OneToMany),
            };
            quote! {
                super::RelationshipSpec {
                    name: #name,
                    target_entity: #target,
                    foreign_key_column: #fk,
                    cardinality: #cardinality,
                },
            }
        });

        let entity_name = entity.name.as_str();
        let table_name = qualified_table.as_str();
        let primary_key = match &entity.primary_key {
            Some(pk) => {
                let pk = pk.as_str();
                quote! { Some(#pk) }
            }
            None => quote! { None },
        };

        let tokens = quote! {
            use serde::{Deserialize, Serialize};

            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct #struct_ident {
                #(#field_tokens)*
            }

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum Column {
                #(#column_variants,)*
            }

            impl Column {
                pub fn column_name(&self) -> &'static str {
                    match self {
                        #(Column::#column_variants => #column_names,)*
                    }
                }
            }

            impl #struct_ident {
                pub const ENTITY_NAME: &'static str = #entity_name;
                pub const TABLE_NAME: &'static str = #table_name;
                pub const PRIMARY_KEY: Option<&'static str> = #primary_key;

                pub fn relationships() -> &'static [super::RelationshipSpec] {
                    &[
                        #(#relationship_entries)*
                    ]
                }

                pub fn validate(&self) -> Result<(), Vec<String>> {
                    let mut violations = Vec::new();
                    #(#length_checks)*
                    if violations.is_empty() {
                        Ok(())
                    } else {
                        Err(violations)
                    }
                }
            }
        };

        let header = format!(
            "// Generated by entity-codegen from {} - do not edit manually\n\n",
            qualified_table
        );
        Ok(format!("{}{}", header, format_code(&tokens.to_string())?))
    }

    /// Generate a read-only projection type for one view: no identity, no
    /// validation, no relationships.
    pub fn generate_view_code(&self, view: &ViewDefinition) -> Result<String> {
        let struct_ident = ident(&view.name);

        let mut field_tokens = Vec::with_capacity(view.result_columns.len());
        for column in &view.result_columns {
            let field = ident(&naming::to_snake_case(&column.name));
            let ty = type_tokens(&column.logical_type.rust_type(column.nullable), &view.name)?;
            field_tokens.push(quote! { pub #field: #ty, });
        }

        let view_name = view.name.as_str();
        let sql_source = view.sql_source.as_str();

        let tokens = quote! {
            use serde::{Deserialize, Serialize};

            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct #struct_ident {
                #(#field_tokens)*
            }

            impl #struct_ident {
                pub const VIEW_NAME: &'static str = #view_name;
                pub const SQL: &'static str = #sql_source;
            }
        };

        let header = format!(
            "// Generated by entity-codegen view projection '{}' - do not edit manually\n\n",
            view.name
        );
        Ok(format!("{}{}", header, format_code(&tokens.to_string())?))
    }

    /// Generate the entity manifest module: module declarations, the
    /// `EntitySpec`/`RelationshipSpec` types, and the `ENTITIES` table the
    /// consuming runtime enumerates instead of scanning namespaces at
    /// startup.
    pub fn generate_manifest(
        &self,
        entities: &[&EntityDefinition],
        manual_modules: &[String],
    ) -> Result<String> {
        let entity_mods: Vec<Ident> = entities
            .iter()
            .map(|e| ident(&naming::to_snake_case(&e.name)))
            .collect();
        let manual_mods: Vec<Ident> = manual_modules.iter().map(|m| ident(m)).collect();

        let entries = entities.iter().map(|e| {
            let name = e.name.as_str();
            let table = format!("{}.{}", e.schema, e.table);
            let module = naming::to_snake_case(&e.name);
            quote! {
                EntitySpec {
                    entity: #name,
                    table: #table,
                    module: #module,
                },
            }
        });

        let tokens = quote! {
            #(pub mod #entity_mods;)*
            #(pub mod #manual_mods;)*

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum Cardinality {
                ManyToOne,
                OneToMany,
            }

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct RelationshipSpec {
                pub name: &'static str,
                pub target_entity: &'static str,
                pub foreign_key_column: &'static str,
                pub cardinality: Cardinality,
            }

            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct EntitySpec {
                pub entity: &'static str,
                pub table: &'static str,
                pub module: &'static str,
            }

            pub const ENTITIES: &[EntitySpec] = &[
                #(#entries)*
            ];
        };

        let header = "// Generated by entity-codegen - entity manifest - do not edit manually\n\n";
        Ok(format!("{}{}", header, format_code(&tokens.to_string())?))
    }

    /// Generate the view manifest module.
    pub fn generate_view_manifest(
        &self,
        views: &[&ViewDefinition],
        manual_modules: &[String],
    ) -> Result<String> {
        let view_mods: Vec<Ident> = views
            .iter()
            .map(|v| ident(&naming::to_snake_case(&v.name)))
            .collect();
        let manual_mods: Vec<Ident> = manual_modules.iter().map(|m| ident(m)).collect();
        let view_names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();

        let tokens = quote! {
            #(pub mod #view_mods;)*
            #(pub mod #manual_mods;)*

            pub const VIEWS: &[&str] = &[
                #(#view_names,)*
            ];
        };

        let header = "// Generated by entity-codegen - view manifest - do not edit manually\n\n";
        Ok(format!("{}{}", header, format_code(&tokens.to_string())?))
    }

    fn length_checks(&self, entity: &EntityDefinition) -> Vec<TokenStream> {
        let mut checks = Vec::new();
        for property in &entity.properties {
            let limit = match &property.logical_type {
                LogicalType::String {
                    max_length: Some(limit),
                } => *limit as usize,
                _ => continue,
            };
            let field = ident(&property.name);
            let message = format!(
                "{} must be at most {} characters",
                property.column_name, limit
            );
            if property.nullable {
                checks.push(quote! {
                    if let Some(value) = &self.#field {
                        if value.chars().count() > #limit {
                            violations.push(#message.to_string());
                        }
                    }
                });
            } else {
                checks.push(quote! {
                    if self.#field.chars().count() > #limit {
                        violations.push(#message.to_string());
                    }
                });
            }
        }
        checks
    }
}

/// Outcome of one generation run: files written (or that would be written
/// under `--dry-run`) plus isolated per-entity failures.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<CodegenError>,
}

/// Write one source file per entity plus the manifest. A failing entity is
/// collected and the rest still generate; existing manual extension files
/// are left untouched and re-exported from the manifest.
pub fn write_entities(
    document: &SchemaDocument,
    out_dir: &Path,
    dry_run: bool,
) -> Result<GenerationReport> {
    if !dry_run {
        fs::create_dir_all(out_dir)?;
    }
    let writer = EntityWriter::new();
    let mut report = GenerationReport::default();
    let mut generated: Vec<&EntityDefinition> = Vec::new();
    let mut used_modules: Vec<String> = Vec::new();

    for entity in &document.entities {
        let module = naming::to_snake_case(&entity.name);
        let file_name = format!("{}.rs", module);
        if is_manual_file(&file_name) {
            report.failures.push(CodegenError::Generation {
                entity: entity.name.clone(),
                reason: format!(
                    "target file {} matches the manual extension pattern",
                    file_name
                ),
            });
            continue;
        }
        if used_modules.iter().any(|m| m == &module) {
            report.failures.push(CodegenError::Generation {
                entity: entity.name.clone(),
                reason: format!("output module {} collides with another entity", module),
            });
            continue;
        }
        match writer.generate_entity_code(entity) {
            Ok(code) => {
                let path = out_dir.join(&file_name);
                if !dry_run {
                    fs::write(&path, code)?;
                }
                log::debug!("generated {}", path.display());
                used_modules.push(module);
                generated.push(entity);
                report.written.push(path);
            }
            Err(e) => report.failures.push(e),
        }
    }

    let manual_modules = find_manual_modules(out_dir)?;
    let manifest = writer.generate_manifest(&generated, &manual_modules)?;
    let manifest_path = out_dir.join("mod.rs");
    if !dry_run {
        fs::write(&manifest_path, manifest)?;
    }
    report.written.push(manifest_path);
    Ok(report)
}

/// Write one source file per view plus the view manifest, with the same
/// isolation and manual-file rules as entities.
pub fn write_views(
    views: &[ViewDefinition],
    out_dir: &Path,
    dry_run: bool,
) -> Result<GenerationReport> {
    if !dry_run {
        fs::create_dir_all(out_dir)?;
    }
    let writer = EntityWriter::new();
    let mut report = GenerationReport::default();
    let mut generated: Vec<&ViewDefinition> = Vec::new();
    let mut used_modules: Vec<String> = Vec::new();

    for view in views {
        let module = naming::to_snake_case(&view.name);
        let file_name = format!("{}.rs", module);
        if is_manual_file(&file_name) {
            report.failures.push(CodegenError::Generation {
                entity: view.name.clone(),
                reason: format!(
                    "target file {} matches the manual extension pattern",
                    file_name
                ),
            });
            continue;
        }
        if used_modules.iter().any(|m| m == &module) {
            report.failures.push(CodegenError::Generation {
                entity: view.name.clone(),
                reason: format!("output module {} collides with another view", module),
            });
            continue;
        }
        match writer.generate_view_code(view) {
            Ok(code) => {
                let path = out_dir.join(&file_name);
                if !dry_run {
                    fs::write(&path, code)?;
                }
                used_modules.push(module);
                generated.push(view);
                report.written.push(path);
            }
            Err(e) => report.failures.push(e),
        }
    }

    let manual_modules = find_manual_modules(out_dir)?;
    let manifest = writer.generate_view_manifest(&generated, &manual_modules)?;
    let manifest_path = out_dir.join("mod.rs");
    if !dry_run {
        fs::write(&manifest_path, manifest)?;
    }
    report.written.push(manifest_path);
    Ok(report)
}

/// Manual extension modules already present in the output directory,
/// sorted for stable manifest output.
fn find_manual_modules(out_dir: &Path) -> Result<Vec<String>> {
    let mut modules = Vec::new();
    if out_dir.exists() {
        for entry in fs::read_dir(out_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_file() && is_manual_file(&name) {
                modules.push(name.trim_end_matches(".rs").to_string());
            }
        }
    }
    modules.sort();
    Ok(modules)
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

/// Turn an arbitrary schema name into a usable identifier: invalid
/// characters become underscores, keywords become raw identifiers.
fn ident(name: &str) -> Ident {
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    match cleaned.as_str() {
        // Not expressible as raw identifiers.
        "self" | "Self" | "super" | "crate" | "_" => {
            cleaned.push('_');
            Ident::new(&cleaned, Span::call_site())
        }
        k if RUST_KEYWORDS.contains(&k) => Ident::new_raw(&cleaned, Span::call_site()),
        _ => Ident::new(&cleaned, Span::call_site()),
    }
}

fn type_tokens(rust_type: &str, entity: &str) -> Result<TokenStream> {
    rust_type.parse().map_err(|e| CodegenError::Generation {
        entity: entity.to_string(),
        reason: format!("invalid generated type `{}`: {}", rust_type, e),
    })
}

/// Format generated source through rustfmt when available; fall back to the
/// raw token rendering otherwise. Availability is constant within an
/// environment, so output stays byte-identical across runs either way.
fn format_code(code: &str) -> Result<String> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = match Command::new("rustfmt")
        .args(["--edition", "2021", "--emit", "stdout"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(_) => return Ok(code.to_string()),
    };

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(code.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if output.status.success() {
        Ok(String::from_utf8(output.stdout).unwrap_or_else(|_| code.to_string()))
    } else {
        Ok(code.to_string())
    }
}
