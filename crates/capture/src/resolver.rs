//! Artifact locator resolution

use crate::error::CaptureError;
use crate::poller::CompletedCommand;
use osc_protocol::truncate_body;
use serde_json::Value;

/// Shape of the artifact reference in a completed command's results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    /// `results.fileUrl`
    Single(String),
    /// `results._fileGroup`, in device order
    Group(Vec<String>),
}

impl ArtifactLocator {
    /// Classify a results payload
    ///
    /// A non-empty `fileUrl` wins over `_fileGroup`. A group only counts when
    /// its first element is a non-empty string.
    pub fn classify(results: &Value) -> Option<Self> {
        match (results.get("fileUrl"), results.get("_fileGroup")) {
            (Some(Value::String(url)), _) if !url.is_empty() => {
                Some(ArtifactLocator::Single(url.clone()))
            }
            (_, Some(Value::Array(items))) => match items.first() {
                Some(Value::String(first)) if !first.is_empty() => Some(ArtifactLocator::Group(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    /// The one locator to download
    pub fn primary(&self) -> Option<&str> {
        let url = match self {
            ArtifactLocator::Single(url) => Some(url.as_str()),
            ArtifactLocator::Group(urls) => urls.first().map(String::as_str),
        };
        url.filter(|url| !url.is_empty())
    }
}

/// Extract the artifact URL from a completed command
///
/// A `done` status without a usable locator breaks the protocol contract and
/// is never treated as success.
pub fn resolve_artifact(command: &CompletedCommand) -> Result<String, CaptureError> {
    command
        .results()
        .and_then(ArtifactLocator::classify)
        .and_then(|locator| locator.primary().map(str::to_string))
        .ok_or_else(|| CaptureError::MissingArtifact {
            id: command.id.clone(),
            body: truncate_body(
                &command
                    .results()
                    .map(Value::to_string)
                    .unwrap_or_else(|| "null".to_string()),
            ),
        })
}
