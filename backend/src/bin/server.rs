//! Teacher Hub HTTP Server Binary
//!
//! Main entry point for the teacher hub functions and REST API.
//! It loads configuration, initializes the repository, wires the outbound
//! email and AI clients into the router, and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! # Run with local (in-memory) repository (default)
//! cargo run --bin teacher-hub-server
//!
//! # Run against the hosted backend
//! HUB_URL=https://project.example.co HUB_SERVICE_ROLE_KEY=... \
//!   cargo run --bin teacher-hub-server --features hosted-repo
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT`: Bind address (default: 0.0.0.0:8080)
//! - `EMAIL_API_KEY`, `EMAIL_FROM`: Outbound email provider
//! - `AI_API_KEY`, `AI_MODEL`: Chat-completions service for name extraction
//! - `APP_LINK_APP_ID`: App identifier served in the app-site-association
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use teacher_hub::config::AppConfig;
use teacher_hub::db;
use teacher_hub::http::{create_router, AppState};
use teacher_hub::services::{HttpMailer, HttpNameExtractor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Teacher Hub server");

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize global repository once and reuse it across the app
    db::init_repository()?;
    let repository = Arc::clone(db::get_repository()?);
    info!("Repository initialized successfully");

    if config.email.api_key.is_empty() {
        warn!("EMAIL_API_KEY is not set; broadcast deliveries will fail");
    }
    if config.ai.api_key.is_empty() {
        warn!("AI_API_KEY is not set; name extraction will fail");
    }

    let mailer = HttpMailer::new(config.email.clone()).context("Failed to build email client")?;
    let extractor =
        HttpNameExtractor::new(config.ai.clone()).context("Failed to build AI client")?;

    let state = AppState::new(repository)
        .with_mailer(Arc::new(mailer))
        .with_extractor(Arc::new(extractor))
        .with_app_id(config.app_links.app_id.clone());

    let app = create_router(state);

    let addr = config.bind_address();
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
