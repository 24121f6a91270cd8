use crate::config::Config;
use crate::errors::AppError;
use crate::pipeline::RecordPipeline;
use crate::upload;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const UPLOAD_FIELD: &str = "file";

const UPLOAD_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
    <head>
        <meta charset="UTF-8">
        <title>Busca de Empresas</title>
    </head>
    <body>
        <h1>Upload de Arquivo CSV</h1>
        <form action="/upload" method="post" enctype="multipart/form-data">
            <input type="file" name="file" accept=".csv" required>
            <button type="submit">Enviar</button>
        </form>
    </body>
</html>
"#;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Enrichment pipeline; its dedup cache is shared by every upload.
    pub pipeline: RecordPipeline,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let pipeline = RecordPipeline::from_config(&config)?;
        Ok(Self { config, pipeline })
    }
}

/// Per-IP request quota applied to `/upload`.
#[derive(Debug, Clone, Copy)]
pub struct UploadRateLimit {
    /// Seconds after which one request of the quota is replenished.
    pub replenish_secs: u64,
    /// Requests allowed in a burst.
    pub burst_size: u32,
}

/// Routes of the service with tracing, CORS and the upload size limit applied.
pub fn router(state: Arc<AppState>) -> Router {
    build_router(state, upload_routes())
}

/// Same as [`router`], with per-IP rate limiting on the upload route.
///
/// The client IP comes from forwarding headers, falling back to the peer
/// address, so the server must be run with connect info.
pub fn rate_limited_router(
    state: Arc<AppState>,
    limit: UploadRateLimit,
) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(limit.replenish_secs)
            .burst_size(limit.burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let upload = upload_routes().layer(GovernorLayer {
        config: governor_conf,
    });
    Ok(build_router(state, upload))
}

fn upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_csv))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

fn build_router(state: Arc<AppState>, upload: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/", get(upload_page))
        .route("/health", get(health))
        .merge(upload)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-cnpj-enrichment",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /
///
/// Static upload form.
pub async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE_HTML)
}

/// POST /upload
///
/// Accepts a multipart form with a `file` field holding the registry export,
/// runs the pipeline to completion and answers with the output file name.
///
/// The run happens on its own task: a client that disconnects stops waiting
/// for the answer but does not cut the run short.
///
/// # Returns
///
/// * `Result<String, AppError>` - Plain-text confirmation or an error.
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<String, AppError> {
    let mut received: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::FormParse(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::FormParse(format!("Failed to read file data: {}", e)))?;
        received = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = received
        .ok_or_else(|| AppError::FormParse(format!("missing '{}' field", UPLOAD_FIELD)))?;

    tracing::info!("Received upload {} ({} bytes)", filename, bytes.len());

    let report = tokio::spawn(async move {
        upload::process_upload(
            &state.pipeline,
            &state.config.output_dir,
            &filename,
            &bytes,
        )
        .await
    })
    .await
    .map_err(|e| AppError::InternalError(format!("upload task failed: {}", e)))??;

    Ok(format!(
        "File {} processed successfully. Results saved to: {}",
        report.input_name,
        report.output_file_name()
    ))
}
