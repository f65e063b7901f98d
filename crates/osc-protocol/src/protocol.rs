//! OSC Wire Types

use crate::command;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Options applied through `camera.setOptions`
///
/// `photo_stitching` is omitted from the wire form when unset. Older firmware
/// rejects unknown option keys outright instead of ignoring them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub capture_mode: String,
    pub hdr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_stitching: Option<String>,
}

impl CaptureOptions {
    /// Single image, HDR off, stitched on the device
    pub fn extended() -> Self {
        Self {
            capture_mode: "image".to_string(),
            hdr: "off".to_string(),
            photo_stitching: Some("ondevice".to_string()),
        }
    }

    /// Single image, HDR off, stitching left to firmware defaults
    pub fn reduced() -> Self {
        Self {
            photo_stitching: None,
            ..Self::extended()
        }
    }

    /// Body for `commands/execute`
    pub fn to_request(&self) -> Value {
        json!({
            "name": command::SET_OPTIONS,
            "parameters": { "options": self },
        })
    }
}

/// Handle of an asynchronous device command
///
/// Deliberately not `Clone`: a handle is owned by exactly one in-flight
/// capture and is consumed when the command resolves.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandHandle(String);

impl CommandHandle {
    /// Extract the handle from an execute response (`{"id": ...}`)
    ///
    /// The id is kept exactly as sent. Returns `None` when it is absent,
    /// empty or not a scalar.
    pub fn from_response(response: &Value) -> Option<Self> {
        let id = match response.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the handle once its command has resolved
    pub fn into_id(self) -> String {
        self.0
    }

    /// Body for `commands/status`
    pub fn to_status_request(&self) -> Value {
        json!({ "id": self.0 })
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State tag of a command status record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum CommandState {
    InProgress,
    Pending,
    Done,
    Error,
    /// Tag this client does not know about
    #[default]
    Unknown,
}

impl From<String> for CommandState {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "inProgress" => CommandState::InProgress,
            "pending" => CommandState::Pending,
            "done" => CommandState::Done,
            "error" => CommandState::Error,
            _ => CommandState::Unknown,
        }
    }
}

/// Status record returned by `commands/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandStatus {
    #[serde(default)]
    pub state: CommandState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl CommandStatus {
    /// Interpret a raw status response
    ///
    /// Each field is read on its own: an off-type side field never hides the
    /// state tag. A missing or non-string tag reads as unknown, so the poller
    /// keeps waiting instead of failing the capture.
    pub fn from_value(mut value: Value) -> Self {
        let mut take = |key: &str| {
            value
                .get_mut(key)
                .map(Value::take)
                .filter(|field| !field.is_null())
        };

        let state = match take("state") {
            Some(Value::String(tag)) => CommandState::from(tag),
            _ => CommandState::Unknown,
        };
        let name = match take("name") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        };

        Self {
            state,
            name,
            results: take("results"),
            error: take("error"),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == CommandState::Done
    }
}
