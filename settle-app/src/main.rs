//! # Settlement Engine Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Build the vault and the HTTP provider factory
//! - Create the payment service
//! - Start the HTTP server

mod config;

use std::{sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settle_hex::{PaymentService, inbound::HttpServer};
use settle_providers::HttpProviderFactory;
use settle_repo::build_repo;
use settle_vault::SecretVault;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,settle_app=debug,settle_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting settlement server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    // Vault and outbound provider adapters. A stalled provider call must
    // surface as a provider error, never hang the checkout.
    let vault = SecretVault::new(&config.vault_secret);
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let providers = Arc::new(HttpProviderFactory::new(http_client));

    // Create the payment service
    let service = PaymentService::new(repo, vault, providers);

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
