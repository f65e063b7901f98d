//! Capture configuration

use crate::poller::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Capture configuration
///
/// Built once per process and injected into the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera host, `host:port`, or base URL
    pub device_host: String,

    /// Directory artifacts are written to (relative to the working directory)
    pub storage_root: PathBuf,

    /// Mount point artifacts are served under
    pub public_mount: String,

    /// Per-request timeout for device calls (milliseconds)
    pub request_timeout_ms: u64,

    /// Bound on a whole artifact download (milliseconds)
    pub download_timeout_ms: u64,

    /// Wait between status queries (milliseconds, raised to at least 10)
    pub poll_interval_ms: u64,

    /// Ceiling for a single command to complete (milliseconds)
    pub poll_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_host: "192.168.42.1".to_string(),
            storage_root: PathBuf::from("storage/insta360"),
            public_mount: "/images".to_string(),
            request_timeout_ms: 10_000,
            download_timeout_ms: 120_000,
            poll_interval_ms: 1_000,
            poll_timeout_ms: 60_000,
        }
    }
}

impl CaptureConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            ceiling: Duration::from_millis(self.poll_timeout_ms),
        }
    }
}
