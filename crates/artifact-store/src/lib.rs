//! Artifact Storage
//!
//! Persists downloaded camera artifacts under generated, collision-free names
//! and maps them to caller-facing reference paths.

mod store;

pub use store::{artifact_file_name, sanitize_label, ArtifactStore, StoredArtifact, DEFAULT_LABEL};

use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("Artifact already exists: {0:?}")]
    Collision(PathBuf),
}
