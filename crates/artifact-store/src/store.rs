//! Artifact Store Implementation

use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Label used when the caller supplies none
pub const DEFAULT_LABEL: &str = "nocode";

/// Compact UTC timestamp, one-second resolution
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const EXTENSION: &str = "jpg";

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
///
/// An absent or empty label becomes [`DEFAULT_LABEL`].
pub fn sanitize_label(label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
        _ => DEFAULT_LABEL.to_string(),
    }
}

/// File name for an artifact captured at `at`: `<stamp>_<label>.jpg`
pub fn artifact_file_name(at: DateTime<Utc>, label: Option<&str>) -> String {
    format!(
        "{}_{}.{}",
        at.format(STAMP_FORMAT),
        sanitize_label(label),
        EXTENSION
    )
}

/// An artifact written to local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArtifact {
    /// Generated file name
    pub file_name: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Reference path under the public mount, e.g. `/images/<file_name>`
    pub public_ref: String,
    /// Bytes written
    pub size_bytes: usize,
}

/// Append-only artifact store rooted at a local directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Absolute storage root
    root: PathBuf,
    /// Public mount point, leading slash, no trailing slash
    public_mount: String,
}

impl ArtifactStore {
    /// Create a store; a relative `root` is resolved against the working directory
    pub fn new(root: impl AsRef<Path>, public_mount: &str) -> Result<Self, StorageError> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| StorageError::Io {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                })?
                .join(root)
        };

        let public_mount = format!("/{}", public_mount.trim_matches('/'));
        info!(
            "Artifact store at {:?}, served under {}",
            root, public_mount
        );

        Ok(Self { root, public_mount })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_mount(&self) -> &str {
        &self.public_mount
    }

    /// Reference path a client uses to retrieve `file_name`
    pub fn public_ref(&self, file_name: &str) -> String {
        if self.public_mount == "/" {
            format!("/{}", file_name)
        } else {
            format!("{}/{}", self.public_mount, file_name)
        }
    }

    /// Create the storage root if it does not exist yet
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Io {
                path: self.root.clone(),
                reason: e.to_string(),
            })
    }

    /// Persist `bytes` under a name stamped with the current time
    pub async fn persist(
        &self,
        label: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredArtifact, StorageError> {
        self.persist_at(Utc::now(), label, bytes).await
    }

    /// Persist `bytes` under a name stamped with `at`
    ///
    /// Never overwrites: an existing file with the same name is a
    /// [`StorageError::Collision`].
    pub async fn persist_at(
        &self,
        at: DateTime<Utc>,
        label: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredArtifact, StorageError> {
        self.ensure_root().await?;

        let file_name = artifact_file_name(at, label);
        let path = self.root.join(&file_name);

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    StorageError::Collision(path.clone())
                } else {
                    StorageError::Io {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        fill_or_discard(&path, file, bytes).await?;

        metrics::counter!("artifact_bytes_stored_total").increment(bytes.len() as u64);
        debug!("Stored {} bytes at {:?}", bytes.len(), path);

        Ok(StoredArtifact {
            public_ref: self.public_ref(&file_name),
            file_name,
            path,
            size_bytes: bytes.len(),
        })
    }
}

/// Write `bytes` to a freshly created file at `path`
///
/// A failed write removes the file, so no truncated artifact is ever served
/// or blocks a later write under the same name.
async fn fill_or_discard<W>(path: &Path, mut writer: W, bytes: &[u8]) -> Result<(), StorageError>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    drop(writer);

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove partial artifact {:?}: {}", path, cleanup);
        }
        return Err(StorageError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        });
    }

    Ok(())
}
