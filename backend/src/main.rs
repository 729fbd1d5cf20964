//! eppgen CLI - Convert spreadsheet orders to EPP flat files
//!
//! # Commands
//!
//! ```bash
//! eppgen export order.xlsx --doc-type MM --label "Sklep 5" --round
//! eppgen detect order.xlsx         # Show the detected header row
//! eppgen catalog                   # Summarize the reference catalog
//! eppgen serve                     # Start HTTP server (port 3000)
//! ```
//!
//! `--catalog` and `--templates` override `EPP_CATALOG_PATH` and
//! `EPP_TEMPLATE_DIR`.

use clap::{Parser, Subcommand};
use eppgen::catalog::Catalog;
use eppgen::config::{AppConfig, ReferenceData};
use eppgen::models::{DocumentType, ExportOptions, PreviewRow};
use eppgen::transform::pipeline::{detect, run_file};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "eppgen")]
#[command(about = "Convert spreadsheet orders to EPP flat-text documents", long_about = None)]
struct Cli {
    /// Reference catalog spreadsheet
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory holding template_ZK.epp / template_MM.epp
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: order sheet → EPP file
    Export {
        /// Order spreadsheet (.xlsx, .xls, .ods or .csv)
        input: PathBuf,

        /// Document type: ZK or MM
        #[arg(short, long, default_value = "ZK")]
        doc_type: DocumentType,

        /// Free-text label for the filename
        #[arg(short, long, default_value = "")]
        label: String,

        /// Round quantities up to full packages
        #[arg(short, long)]
        round: bool,

        /// Directory to write the EPP file into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the header row detected in an order sheet
    Detect {
        /// Order spreadsheet
        input: PathBuf,
    },

    /// Summarize the reference catalog
    Catalog {
        /// Also list every entry
        #[arg(long)]
        list: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: EPP_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match load_config(&cli) {
        Ok(config) => match cli.command {
            Commands::Export {
                input,
                doc_type,
                label,
                round,
                out_dir,
                json,
            } => {
                let options = ExportOptions {
                    document_type: doc_type,
                    label,
                    round_to_packages: round,
                };
                cmd_export(&config, &input, &options, &out_dir, json)
            }

            Commands::Detect { input } => cmd_detect(&input),

            Commands::Catalog { list } => cmd_catalog(&config, list),

            Commands::Serve { port } => cmd_serve(&config, port).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(ref catalog) = cli.catalog {
        config.catalog_path = catalog.clone();
    }
    if let Some(ref templates) = cli.templates {
        config.template_dir = templates.clone();
    }
    Ok(config)
}

fn cmd_export(
    config: &AppConfig,
    input: &Path,
    options: &ExportOptions,
    out_dir: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {} ({})", input.display(), options.document_type.description());

    let reference = ReferenceData::load(config)?;
    let output = run_file(&reference, input, options, reference.now())?;

    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(&output.export.suggested_filename);
    fs::write(&out_path, &output.bytes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_preview(&output.preview);
        for adjustment in &output.adjustments {
            println!("ℹ️  {}", adjustment);
        }
        println!("\n⚖️  Total weight: {:.2} kg", output.export.total_weight_kg);
    }

    eprintln!("💾 Saved to: {}", out_path.display());
    Ok(())
}

fn cmd_detect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔎 Detecting header: {}", input.display());

    let bytes = fs::read(input)?;
    let (grid, header) = detect(&bytes, input.file_name().and_then(|n| n.to_str()))?;

    println!("Header row: {} of {}", header.row + 1, grid.len());
    for (field, column) in &header.columns {
        println!("  {:<8} → column {} \"{}\"", field.key(), column.index + 1, column.label);
    }
    Ok(())
}

fn cmd_catalog(config: &AppConfig, list: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(&config.catalog_path)?;

    let with_packaging = catalog.entries().iter().filter(|e| e.packaging_count > 1).count();
    let without_weight = catalog.entries().iter().filter(|e| e.unit_weight_kg == 0.0).count();

    println!("📋 Catalog: {}", config.catalog_path.display());
    println!("   Entries:           {}", catalog.len());
    println!("   Packaging > 1:     {}", with_packaging);
    println!("   Missing weight:    {}", without_weight);

    if list {
        println!();
        for entry in catalog.entries() {
            println!(
                "   {:<16} pack {:>4}   {:>8.3} kg",
                entry.identifier, entry.packaging_count, entry.unit_weight_kg
            );
        }
    }
    Ok(())
}

async fn cmd_serve(config: &AppConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let reference = ReferenceData::load(config)?;
    eppgen::api::start_server(reference, port.unwrap_or(config.port)).await
}

fn print_preview(rows: &[PreviewRow]) {
    println!(
        "{:<16} {:<24} {:>10} {:>10} {:>12} {:>10} {:>6}",
        "EAN", "Nazwa", "Ilość", "Waga/szt", "Waga razem", "Cena netto", "VAT"
    );
    println!("{}", "-".repeat(94));
    for row in rows {
        println!(
            "{:<16} {:<24} {:>10} {:>10.3} {:>12.3} {:>10.2} {:>6}",
            row.identifier,
            row.name,
            row.quantity,
            row.unit_weight_kg,
            row.total_weight_kg,
            row.net_price,
            row.vat_rate
        );
    }
}
