//! OSC Error Types

use thiserror::Error;

/// Errors that can occur while talking to the camera
#[derive(Debug, Error)]
pub enum OscError {
    /// Device answered with a non-success HTTP status
    #[error("OSC {method} {path} failed: {status} {body}")]
    Protocol {
        method: &'static str,
        path: String,
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Artifact download answered with a non-success HTTP status
    #[error("Artifact download from {url} failed: {status} {body}")]
    Download {
        url: String,
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Request never produced a response (refused, reset, timed out)
    #[error("Transport error on {target}: {reason}")]
    Transport { target: String, reason: String },

    /// Request body could not be encoded
    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

impl OscError {
    /// HTTP status carried by the error, if the device answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            OscError::Protocol { status, .. } | OscError::Download { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the device explicitly rejected the request
    pub fn is_rejection(&self) -> bool {
        matches!(self, OscError::Protocol { .. })
    }
}

impl From<serde_json::Error> for OscError {
    fn from(err: serde_json::Error) -> Self {
        OscError::Encode(err.to_string())
    }
}
