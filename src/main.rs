//! Analytics proxy for the newsroom admin dashboard.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom_analytics::config::ProxyConfig;
use newsroom_analytics::handler::AnalyticsHandler;
use newsroom_analytics::server::{router, ANALYTICS_PATH};
use newsroom_analytics::source::{
    ChainCredentialSource, CredentialSource, EnvCredentialSource, ServiceAccountFileSource,
};

#[derive(Parser, Debug)]
#[command(
    name = "newsroom-analytics",
    version,
    about = "Serve reader analytics to the newsroom admin dashboard"
)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "ANALYTICS_LISTEN", default_value = "127.0.0.1:8788")]
    listen: SocketAddr,

    /// Service-account JSON key file, tried before GA_CLIENT_EMAIL/GA_PRIVATE_KEY
    #[arg(long, env = "GA_CREDENTIALS_FILE")]
    credentials_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,newsroom_analytics=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ProxyConfig::from_env().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    let mut sources: Vec<Box<dyn CredentialSource>> = Vec::new();
    if let Some(path) = &cli.credentials_file {
        tracing::info!("Service-account key file configured: {}", path.display());
        sources.push(Box::new(ServiceAccountFileSource::new(path)));
    }
    sources.push(Box::new(EnvCredentialSource::new()));

    tracing::info!(
        property_id = %config.property_id,
        token_url = %config.token_url,
        timeout_secs = config.timeout.as_secs(),
        "analytics proxy configured"
    );

    let handler = Arc::new(AnalyticsHandler::new(
        ChainCredentialSource::new(sources),
        config,
    ));
    let app = router(handler);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .map_err(|e| {
            tracing::error!("Failed to bind to {}: {}", cli.listen, e);
            e
        })?;
    tracing::info!("Listening on http://{}{}", cli.listen, ANALYTICS_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            e
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
