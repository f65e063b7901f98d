//! Camera Capture Server - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Camera Capture Server v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Camera at {}, artifacts in {:?} served under {}",
        settings.capture.device_host, settings.capture.storage_root, settings.capture.public_mount
    );

    run_server(settings).await
}
