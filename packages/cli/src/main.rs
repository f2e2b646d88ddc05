#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for PDF statement table extraction.
//!
//! ```text
//! statement_tables extract <PDF> [--method auto|primary|secondary] [--classify]
//! statement_tables serve
//! ```
//!
//! `extract` prints the same JSON body the HTTP API returns and exits with
//! status 1 when no tables are found or extraction fails.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use statement_tables_extract::ExtractError;
use statement_tables_server::config::{self, ServerConfig};
use statement_tables_server_models::{ApiExtractFailure, ApiExtractSuccess};
use statement_tables_table_models::RequestedMethod;

#[derive(Parser)]
#[command(
    name = "statement_tables",
    about = "Extract tables from PDF financial statements"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables from a PDF and print them as JSON
    Extract {
        /// Path to the PDF
        pdf: PathBuf,
        /// Engine selection: auto, primary (camelot), or secondary (tabula)
        #[arg(long, default_value = "auto")]
        method: RequestedMethod,
        /// Label each table as holdings, investment or cash transactions
        #[arg(long)]
        classify: bool,
        /// Config file (defaults to `$STATEMENT_TABLES_CONFIG` or
        /// `statement_tables.toml`)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Start the HTTP API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            pdf,
            method,
            classify,
            config: config_path,
        } => {
            let server_config = match config_path {
                Some(path) => ServerConfig::load_from(&path)?,
                None => config::load()?,
            };
            let body = tokio::task::spawn_blocking(move || {
                extract(&server_config, &pdf, method, classify)
            })
            .await??;

            println!("{}", body.json);
            Ok(if body.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Serve => {
            // Actix drives its own system runtime; keep it off this tokio
            // runtime's worker threads.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(statement_tables_server::run_server())
            })
            .await??;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Rendered result of a CLI extraction.
struct Output {
    success: bool,
    json: String,
}

fn extract(
    config: &ServerConfig,
    pdf: &Path,
    method: RequestedMethod,
    classify: bool,
) -> Result<Output, serde_json::Error> {
    let extractor = statement_tables_server::build_extractor(&config.engines);
    let filename = pdf
        .file_name()
        .map_or_else(|| pdf.display().to_string(), |n| n.to_string_lossy().into_owned());

    match extractor.extract(pdf, &filename, method, classify) {
        Ok(extraction) => {
            log::info!("Extracted {} tables from {filename}", extraction.tables.len());
            Ok(Output {
                success: true,
                json: serde_json::to_string_pretty(&ApiExtractSuccess::new(
                    extraction.tables,
                    extraction.info,
                ))?,
            })
        }
        Err(e) => {
            if matches!(e, ExtractError::Failed { .. }) {
                log::error!("Extraction of {filename} failed: {e}");
            }
            let message = e.to_string();
            Ok(Output {
                success: false,
                json: serde_json::to_string_pretty(&ApiExtractFailure::new(
                    message,
                    e.into_info(),
                ))?,
            })
        }
    }
}
