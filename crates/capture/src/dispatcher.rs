//! Shutter dispatch

use crate::error::{CaptureError, Stage};
use osc_protocol::{command, endpoint, truncate_body, CommandHandle, DeviceChannel};
use serde_json::json;
use tracing::info;

/// Fire the shutter and return the command handle
///
/// Never retried: a partially accepted capture must not trigger the shutter
/// a second time.
pub async fn dispatch_take_picture(channel: &dyn DeviceChannel) -> Result<CommandHandle, CaptureError> {
    let response = channel
        .post(endpoint::EXECUTE, Some(json!({ "name": command::TAKE_PICTURE })))
        .await
        .map_err(CaptureError::device(Stage::Dispatch))?;

    let handle = CommandHandle::from_response(&response).ok_or_else(|| CaptureError::Command {
        body: truncate_body(&response.to_string()),
    })?;

    info!("camera.takePicture accepted as command {}", handle);
    Ok(handle)
}
