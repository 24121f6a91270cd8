use rust_cnpj_enrichment::config::Config;
use rust_cnpj_enrichment::handlers::{self, AppState, UploadRateLimit};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, builds the enrichment pipeline
/// (registry client and process-wide dedup cache) and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_cnpj_enrichment=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to create output directory {}: {}",
                config.output_dir.display(),
                e
            )
        })?;

    let state = Arc::new(AppState::from_config(config.clone())?);
    tracing::info!(
        "✓ Registry client initialized: {} (timeout {}s)",
        config.lookup_base_url,
        config.lookup_timeout_secs
    );
    tracing::info!(
        "CNPJ deduplication cache initialized ({}s cooldown, {} max entries)",
        config.dedup_cooldown_secs,
        config.dedup_max_entries
    );

    // Uploads block for the whole run, so a low per-IP rate is enough
    let app = handlers::rate_limited_router(
        state,
        UploadRateLimit {
            replenish_secs: 2,
            burst_size: 5,
        },
    )?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
