//! Camera Capture Orchestrator
//!
//! Drives an OSC panoramic camera through one photo capture:
//! - Capability negotiation with a reduced-option fallback
//! - Shutter dispatch returning an asynchronous command handle
//! - Bounded completion polling against an injectable clock
//! - Artifact locator resolution, download and local persistence

mod clock;
mod config;
mod dispatcher;
mod error;
mod fetcher;
mod negotiator;
mod orchestrator;
mod poller;
mod resolver;

#[cfg(test)]
mod testing;

pub use clock::{Clock, TokioClock};
pub use config::CaptureConfig;
pub use dispatcher::dispatch_take_picture;
pub use error::{CaptureError, Stage};
pub use fetcher::fetch_artifact;
pub use negotiator::{negotiate_capture_mode, OptionSet};
pub use orchestrator::{CaptureOrchestrator, CaptureResult};
pub use poller::{CompletedCommand, CompletionPoller, PollPolicy, MIN_POLL_INTERVAL};
pub use resolver::{resolve_artifact, ArtifactLocator};

pub use artifact_store::{ArtifactStore, StoredArtifact};
pub use osc_protocol::{DeviceChannel, HttpChannel, OscError};
