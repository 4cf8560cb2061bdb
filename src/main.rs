//! Command-line interface for pwsxml

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use pwsxml::documents::{validate_file, SchemaKind, ValidationReport};
#[cfg(feature = "cli")]
use pwsxml::limits::Limits;
#[cfg(feature = "cli")]
use pwsxml::validators::{EntrySchema, FilterSchema, Schema};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "pwsxml")]
#[command(author, version, about = "Password Safe XML import validator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an entry or filter import file
    Validate {
        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Schema: entries or filters (detected from the root element when omitted)
        #[arg(short, long)]
        schema: Option<String>,

        /// Resource limits: default, strict or permissive
        #[arg(short, long, default_value = "default")]
        limits: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the elements of an import schema
    Inspect {
        /// Schema: entries or filters
        #[arg(value_name = "SCHEMA")]
        schema: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            file,
            schema,
            limits,
            json,
        } => cmd_validate(file, schema, limits, json),
        Commands::Inspect { schema, json } => cmd_inspect(schema, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(
    file: PathBuf,
    schema: Option<String>,
    limits: String,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema.map(|s| s.parse::<SchemaKind>()).transpose()?;
    let limits = Limits::from_name(&limits.to_lowercase())?;

    let result = validate_file(&file, schema, &limits);
    if let Err(pwsxml::Error::Io(e)) = &result {
        return Err(format!("Cannot read {}: {}", file.display(), e).into());
    }
    let report = ValidationReport::from_result(schema, &result);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &result {
            Ok(kind) => println!("✓ Document is valid ({})", kind),
            Err(e) => {
                println!("✗ Document is invalid");
                println!();
                println!("{}", e);
            }
        }
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_inspect(schema: String, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let rows = match schema.parse::<SchemaKind>()? {
        SchemaKind::Entries => describe::<EntrySchema>(),
        SchemaKind::Filters => describe::<FilterSchema>(),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<28} {:<10} {:<24} PARENTS", "ELEMENT", "OCCURS", "CONTENT");
    for row in &rows {
        println!(
            "{:<28} {:<10} {:<24} {}",
            row["name"].as_str().unwrap_or(""),
            row["occurs"].as_str().unwrap_or(""),
            row["content"].as_str().unwrap_or(""),
            row["parents"]
                .as_array()
                .map(|p| p.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", "))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// One JSON row per element descriptor
#[cfg(feature = "cli")]
fn describe<S: Schema>() -> Vec<serde_json::Value> {
    let table = S::table();
    table
        .iter()
        .map(|d| {
            let parents: Vec<&str> = d
                .parents
                .iter()
                .filter_map(|p| table.descriptor(*p))
                .map(|p| p.name)
                .collect();
            serde_json::json!({
                "name": d.name,
                "occurs": d.occurs.to_string(),
                "content": d.content.to_string(),
                "parents": parents,
            })
        })
        .collect()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
