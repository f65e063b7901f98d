//! Artifact download and persistence

use crate::error::{CaptureError, Stage};
use artifact_store::{ArtifactStore, StoredArtifact};
use osc_protocol::DeviceChannel;
use tracing::info;

/// Download the artifact at `url` and write it to `store`
pub async fn fetch_artifact(
    channel: &dyn DeviceChannel,
    store: &ArtifactStore,
    url: &str,
    label: Option<&str>,
) -> Result<StoredArtifact, CaptureError> {
    let bytes = channel
        .download(url)
        .await
        .map_err(CaptureError::device(Stage::Download))?;
    info!("Downloaded {} bytes from {}", bytes.len(), url);

    let stored = store.persist(label, &bytes).await?;
    info!("Artifact stored as {}", stored.public_ref);
    Ok(stored)
}
