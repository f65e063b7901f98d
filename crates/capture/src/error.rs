//! Capture Error Types

use artifact_store::StorageError;
use osc_protocol::OscError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error arose in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Info,
    State,
    Configure,
    Dispatch,
    Poll,
    Resolve,
    Download,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Info => "info",
            Stage::State => "state",
            Stage::Configure => "configure",
            Stage::Dispatch => "dispatch",
            Stage::Poll => "poll",
            Stage::Resolve => "resolve",
            Stage::Download => "download",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a capture
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The orchestrator could not be built
    #[error("Capture setup failed: {0}")]
    Setup(String),

    /// Device call failed (non-success status or no response)
    #[error("{stage} stage failed: {source}")]
    Device {
        stage: Stage,
        #[source]
        source: OscError,
    },

    /// `camera.takePicture` was accepted without a command id
    #[error("camera.takePicture response carried no command id: {body}")]
    Command { body: String },

    /// Command did not reach `done` before the polling ceiling
    #[error("Command {id} did not complete within {elapsed_ms}ms")]
    Timeout { id: String, elapsed_ms: u64 },

    /// Command reached `done` without a usable artifact locator
    #[error("Command {id} completed without an artifact locator: {body}")]
    MissingArtifact { id: String, body: String },

    /// Artifact could not be written locally
    #[error("Failed to store artifact: {0}")]
    Storage(#[from] StorageError),
}

impl CaptureError {
    pub(crate) fn device(stage: Stage) -> impl FnOnce(OscError) -> CaptureError {
        move |source| CaptureError::Device { stage, source }
    }

    /// Stage the capture was aborted in
    pub fn stage(&self) -> Stage {
        match self {
            CaptureError::Setup(_) => Stage::Setup,
            CaptureError::Device { stage, .. } => *stage,
            CaptureError::Command { .. } => Stage::Dispatch,
            CaptureError::Timeout { .. } => Stage::Poll,
            CaptureError::MissingArtifact { .. } => Stage::Resolve,
            CaptureError::Storage(_) => Stage::Persist,
        }
    }

    /// HTTP status returned by the device, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CaptureError::Device { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Short machine-readable error class
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::Setup(_) => "setup",
            CaptureError::Device {
                source: OscError::Download { .. },
                ..
            } => "download",
            CaptureError::Device {
                source: OscError::Protocol { .. },
                ..
            } => "protocol",
            CaptureError::Device { .. } => "transport",
            CaptureError::Command { .. } => "command",
            CaptureError::Timeout { .. } => "timeout",
            CaptureError::MissingArtifact { .. } => "missing_artifact",
            CaptureError::Storage(_) => "storage",
        }
    }
}
