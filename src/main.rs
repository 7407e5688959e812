use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use intent_catalogue::config::CatalogueConfig;
use intent_catalogue::database::connect_and_migrate;
use intent_catalogue::ingestion::RowDescriptor;
use intent_catalogue::services::{
    preview_dacpac, preview_spreadsheet, ConflictPolicy, ImportReport, ImportService,
};
use serde_json::json;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Parse a source file and reconcile it into the catalogue
    Import {
        #[clap(subcommand)]
        source: ImportCommands,
    },
    /// Parse a source file and print the rows without touching the catalogue
    Preview {
        #[clap(subcommand)]
        source: PreviewCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ImportCommands {
    Dacpac {
        file: PathBuf,
        #[clap(short, long)]
        server: String,
        #[clap(long)]
        database_name: String,
        #[clap(short, long, default_value = "add-new-only")]
        policy: ConflictPolicy,
        /// Report what would change without committing anything
        #[clap(long)]
        dry_run: bool,
        #[clap(short, long)]
        database: Option<String>,
    },
    Spreadsheet {
        file: PathBuf,
        #[clap(short, long, default_value = "add-new-only")]
        policy: ConflictPolicy,
        /// Report what would change without committing anything
        #[clap(long)]
        dry_run: bool,
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PreviewCommands {
    Dacpac {
        file: PathBuf,
        #[clap(short, long)]
        server: String,
        #[clap(long)]
        database_name: String,
    },
    Spreadsheet {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = CatalogueConfig::from_env();

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                let config = with_database(config, database);
                info!("Initializing database: {}", config.database_path);
                connect_and_migrate(&config.database_path)
                    .await
                    .with_context(|| format!("Failed to migrate {}", config.database_path))?;
            }
        },
        Commands::Import { source } => match source {
            ImportCommands::Dacpac {
                file,
                server,
                database_name,
                policy,
                dry_run,
                database,
            } => {
                let bytes = read_source(&file).await?;
                let service = ImportService::connect(with_database(config, database)).await?;
                info!("Importing dacpac {} with policy {}", file.display(), policy);
                let report = service
                    .import_dacpac(bytes, &server, &database_name, policy, dry_run)
                    .await
                    .with_context(|| format!("Failed to import {}", file.display()))?;
                print_report(&report)?;
            }
            ImportCommands::Spreadsheet {
                file,
                policy,
                dry_run,
                database,
            } => {
                let bytes = read_source(&file).await?;
                let service = ImportService::connect(with_database(config, database)).await?;
                info!("Importing spreadsheet {} with policy {}", file.display(), policy);
                let report = service
                    .import_spreadsheet(bytes, policy, dry_run)
                    .await
                    .with_context(|| format!("Failed to import {}", file.display()))?;
                print_report(&report)?;
            }
        },
        Commands::Preview { source } => match source {
            PreviewCommands::Dacpac {
                file,
                server,
                database_name,
            } => {
                let bytes = read_source(&file).await?;
                let rows = preview_dacpac(bytes, &server, &database_name)
                    .await
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                println!("{}", serde_json::to_string_pretty(&dacpac_preview(&rows))?);
            }
            PreviewCommands::Spreadsheet { file } => {
                let bytes = read_source(&file).await?;
                let parsed = preview_spreadsheet(bytes, &config.preferred_worksheet)
                    .await
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            }
        },
    }

    Ok(())
}

fn with_database(config: CatalogueConfig, database: Option<String>) -> CatalogueConfig {
    match database {
        Some(path) => config.with_database_path(path),
        None => config,
    }
}

async fn read_source(file: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn dacpac_preview(rows: &[RowDescriptor]) -> serde_json::Value {
    json!({ "rows": rows })
}

fn print_report(report: &ImportReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "sqlx=warn,sea_orm_migration=warn,{}",
            log_level
        )))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
