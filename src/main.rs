//! Entity code generation tool
//!
//! Generates entity definitions, the intermediate schema document, and
//! read-only view projections from SQL DDL, as actual Rust source files.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use entity_codegen::{parser, schema, views, writer};

#[derive(Parser)]
#[command(name = "entity-codegen")]
#[command(about = "Generate entity code from SQL DDL schemas", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate entity code and the schema document from DDL
    Generate {
        /// Input .sql file or directory of .sql files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for generated code
        #[arg(short, long, default_value = "src/entities")]
        output: PathBuf,

        /// Path for the intermediate schema document
        #[arg(long)]
        schema_doc: Option<PathBuf>,

        /// Application name recorded in the schema document
        #[arg(long)]
        app_name: Option<String>,

        /// Compute the full pipeline but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate read-only view projections from a view registry
    Views {
        /// View registry TOML document
        #[arg(short, long)]
        registry: PathBuf,

        /// Output directory for generated code
        #[arg(short, long, default_value = "src/views")]
        output: PathBuf,

        /// Compute the full pipeline but write nothing
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; warnings go to stderr, one line each.
    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Generate {
            input,
            output,
            schema_doc,
            app_name,
            dry_run,
        } => generate_entities(&input, &output, schema_doc, app_name, dry_run),
        Commands::Views {
            registry,
            output,
            dry_run,
        } => generate_views(&registry, &output, dry_run),
    }
}

fn generate_entities(
    input: &PathBuf,
    output: &PathBuf,
    schema_doc: Option<PathBuf>,
    app_name: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    println!("🔧 entity-codegen");
    println!("📥 Input: {}", input.display());
    println!("📤 Output: {}", output.display());
    if dry_run {
        println!("⚠️  Dry run - nothing will be written");
    }

    let parsed = parser::parse_file(input)?;
    for warning in &parsed.warnings {
        log::warn!("{}", warning);
    }
    if parsed.tables.is_empty() {
        anyhow::bail!("No tables found in input");
    }

    let application = app_name.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schema".to_string())
    });
    let document = schema::build(&parsed.tables, &application)?;

    let rendered = document.to_json()?;
    let doc_path = schema_doc.unwrap_or_else(|| output.join("schema.json"));
    if !dry_run {
        if let Some(parent) = doc_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&doc_path, &rendered)?;
    }
    println!("📄 Schema document: {}", doc_path.display());

    let report = writer::write_entities(&document, output, dry_run)?;
    for path in &report.written {
        println!("✅ Generated: {}", path.display());
    }

    let generated = document.entities.len() - report.failures.len();
    println!(
        "✨ Generated {} entit{}",
        generated,
        if generated == 1 { "y" } else { "ies" }
    );

    if !report.failures.is_empty() {
        for failure in &report.failures {
            eprintln!("❌ {}", failure);
        }
        anyhow::bail!(
            "{} of {} entities failed to generate",
            report.failures.len(),
            document.entities.len()
        );
    }
    Ok(())
}

fn generate_views(registry: &PathBuf, output: &PathBuf, dry_run: bool) -> anyhow::Result<()> {
    println!("🔧 entity-codegen (views)");
    println!("📥 Registry: {}", registry.display());
    println!("📤 Output: {}", output.display());
    if dry_run {
        println!("⚠️  Dry run - nothing will be written");
    }

    let (view_defs, mut failures) = views::load_registry(registry)?;
    let total = view_defs.len() + failures.len();
    if total == 0 {
        anyhow::bail!("No views declared in registry");
    }

    let report = writer::write_views(&view_defs, output, dry_run)?;
    failures.extend(report.failures);
    for path in &report.written {
        println!("✅ Generated: {}", path.display());
    }

    let generated = total - failures.len();
    println!(
        "✨ Generated {} view{}",
        generated,
        if generated == 1 { "" } else { "s" }
    );

    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("❌ {}", failure);
        }
        anyhow::bail!("{} of {} views failed to generate", failures.len(), total);
    }
    Ok(())
}
