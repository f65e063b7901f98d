//! Capture Orchestrator
//!
//! Composes negotiation, dispatch, polling, resolution and persistence into
//! one sequential capture. Any stage failure aborts the whole capture; there
//! is no partial result and no whole-operation retry.
//!
//! Concurrent captures against the same camera are not serialized here. The
//! host must hold a per-device lock around [`CaptureOrchestrator::capture_single_image`].

use crate::clock::{Clock, TokioClock};
use crate::config::CaptureConfig;
use crate::dispatcher::dispatch_take_picture;
use crate::error::{CaptureError, Stage};
use crate::fetcher::fetch_artifact;
use crate::negotiator::{negotiate_capture_mode, OptionSet};
use crate::poller::{CompletionPoller, PollPolicy};
use crate::resolver::resolve_artifact;
use artifact_store::ArtifactStore;
use osc_protocol::{endpoint, DeviceChannel, HttpChannel, OscError};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of one successful capture
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    /// Absolute path of the stored artifact
    pub path: PathBuf,
    /// Reference path under the public mount
    pub public_ref: String,
    /// Locator the artifact was downloaded from
    pub file_url: String,
    /// Id of the resolved `camera.takePicture` command
    pub command_id: String,
    /// Option set the camera accepted
    pub option_set: OptionSet,
    /// Device info snapshot, if it could be fetched
    pub info: Option<Value>,
    /// Device state snapshot, if it could be fetched
    pub state: Option<Value>,
}

/// Drives one camera through single-image captures
pub struct CaptureOrchestrator<C, K = TokioClock> {
    channel: C,
    clock: K,
    store: ArtifactStore,
    policy: PollPolicy,
}

impl CaptureOrchestrator<HttpChannel, TokioClock> {
    /// Build an orchestrator talking HTTP to the configured camera
    pub fn from_config(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let channel = HttpChannel::new(&config.device_host, config.request_timeout())
            .map_err(|e| CaptureError::Setup(e.to_string()))?
            .with_download_timeout(config.download_timeout());
        let store = ArtifactStore::new(&config.storage_root, &config.public_mount)?;
        Ok(Self::new(channel, TokioClock, store, config.poll_policy()))
    }
}

impl<C: DeviceChannel, K: Clock> CaptureOrchestrator<C, K> {
    pub fn new(channel: C, clock: K, store: ArtifactStore, policy: PollPolicy) -> Self {
        Self {
            channel,
            clock,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Capture one image and store it locally
    ///
    /// Cancelling the returned future only abandons waiting; a command the
    /// camera already accepted keeps running on the device.
    pub async fn capture_single_image(
        &self,
        label: Option<&str>,
    ) -> Result<CaptureResult, CaptureError> {
        let started = Instant::now();
        metrics::counter!("capture_attempts_total").increment(1);

        let result = self.run(label).await;

        metrics::histogram!("capture_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(capture) => {
                metrics::counter!("capture_success_total").increment(1);
                info!(
                    "Capture {} stored at {} in {:?}",
                    capture.command_id,
                    capture.public_ref,
                    started.elapsed()
                );
            }
            Err(e) => {
                metrics::counter!("capture_failures_total", "stage" => e.stage().as_str())
                    .increment(1);
                error!("Capture failed in {} stage: {}", e.stage(), e);
            }
        }

        result
    }

    async fn run(&self, label: Option<&str>) -> Result<CaptureResult, CaptureError> {
        self.store.ensure_root().await?;

        let info = best_effort(Stage::Info, self.channel.get(endpoint::INFO).await);
        let state = best_effort(Stage::State, self.channel.post(endpoint::STATE, None).await);

        let option_set = negotiate_capture_mode(&self.channel).await?;
        let handle = dispatch_take_picture(&self.channel).await?;

        let completed = CompletionPoller::new(&self.channel, &self.clock, self.policy)
            .wait(handle)
            .await?;
        let file_url = resolve_artifact(&completed)?;

        let stored = fetch_artifact(&self.channel, &self.store, &file_url, label).await?;

        Ok(CaptureResult {
            path: stored.path,
            public_ref: stored.public_ref,
            file_url,
            command_id: completed.id,
            option_set,
            info,
            state,
        })
    }
}

/// Diagnostic snapshots never gate a capture
fn best_effort(stage: Stage, result: Result<Value, OscError>) -> Option<Value> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping device {} snapshot: {}", stage, e);
            None
        }
    }
}
