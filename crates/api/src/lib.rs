//! Camera Capture API Server
//!
//! HTTP host for the capture orchestrator: triggers captures, serves stored
//! artifacts under the public mount, and reports health and metrics.

use axum::{
    routing::{get, post},
    Router,
};
use capture::{CaptureOrchestrator, HttpChannel, TokioClock};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub mod routes;
pub mod settings;

pub use settings::{ServerSettings, Settings};

/// Application state shared across handlers
pub struct AppState {
    /// Orchestrator for the configured camera
    pub orchestrator: CaptureOrchestrator<HttpChannel, TokioClock>,
    /// Held for the whole of each capture; the camera has one shutter
    pub camera_lock: Mutex<()>,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        orchestrator: CaptureOrchestrator<HttpChannel, TokioClock>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            orchestrator,
            camera_lock: Mutex::new(()),
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let store = state.orchestrator.store();
    let artifacts = ServeDir::new(store.root());
    let mount = store.public_mount().to_string();

    let router = Router::new()
        .route("/healthz", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .route("/insta360/capture", post(routes::capture::capture));

    let router = if mount == "/" {
        router.fallback_service(artifacts)
    } else {
        router.nest_service(&mount, artifacts)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Run the server
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = CaptureOrchestrator::from_config(&settings.capture)?;
    orchestrator.store().ensure_root().await?;

    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(AppState::new(orchestrator, Some(metrics)));
    let app = create_router(state);

    let addr = settings.server.bind_address();
    info!("Starting capture server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
