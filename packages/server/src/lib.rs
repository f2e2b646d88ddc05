#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for PDF statement table extraction.
//!
//! Accepts a PDF upload, runs it through the primary (ruled-table) engine
//! and falls back to the secondary (borderless) engine when the primary
//! finds nothing. Responses carry the tables plus per-engine diagnostics.

pub mod config;
mod handlers;
pub mod upload;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use statement_tables_extract::Extractor;
use statement_tables_pdf::command::CommandEngine;

use crate::config::{EnginesConfig, ServerConfig};

/// Shared application state.
pub struct AppState {
    /// Extraction pipeline shared by all workers.
    pub extractor: Arc<Extractor>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

/// Builds the two-engine extractor from configuration.
#[must_use]
pub fn build_extractor(engines: &EnginesConfig) -> Extractor {
    Extractor::with_fallback(
        CommandEngine::lattice(engines.primary.clone()),
        CommandEngine::stream(engines.secondary.clone()),
    )
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/extract-tables", web::post().to(handlers::extract_tables))
        .route(
            "/extract-with-classification",
            web::post().to(handlers::extract_with_classification),
        );
}

/// Loads configuration and starts the server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the config file is invalid, or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = config::load().map_err(std::io::Error::other)?;
    run_with_config(config).await
}

/// Starts the server with an already loaded configuration.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_with_config(config: ServerConfig) -> std::io::Result<()> {
    log::info!(
        "Engines: primary={} secondary={}",
        config.engines.primary.program,
        config.engines.secondary.program
    );

    let state = web::Data::new(AppState {
        extractor: Arc::new(build_extractor(&config.engines)),
        max_upload_bytes: config.max_upload_bytes,
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
