//! Capability negotiation

use crate::error::{CaptureError, Stage};
use osc_protocol::{endpoint, CaptureOptions, DeviceChannel, OscError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Option set the camera accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSet {
    /// Image mode, HDR off, on-device stitching
    Extended,
    /// Image mode, HDR off
    Reduced,
}

impl OptionSet {
    pub fn options(&self) -> CaptureOptions {
        match self {
            OptionSet::Extended => CaptureOptions::extended(),
            OptionSet::Reduced => CaptureOptions::reduced(),
        }
    }
}

async fn apply(channel: &dyn DeviceChannel, set: OptionSet) -> Result<(), OscError> {
    debug!("Applying {:?} capture options", set);
    channel
        .post(endpoint::EXECUTE, Some(set.options().to_request()))
        .await
        .map(|_| ())
}

/// Put the camera into single-image mode
///
/// Tries the extended option set first. If the camera rejects it, retries
/// exactly once without `photoStitching`. A transport failure, or a rejection
/// of the reduced set, aborts the capture.
pub async fn negotiate_capture_mode(channel: &dyn DeviceChannel) -> Result<OptionSet, CaptureError> {
    match apply(channel, OptionSet::Extended).await {
        Ok(()) => {
            info!("Camera accepted extended capture options");
            Ok(OptionSet::Extended)
        }
        Err(e) if e.is_rejection() => {
            warn!("Extended capture options rejected, retrying without photoStitching: {}", e);
            apply(channel, OptionSet::Reduced)
                .await
                .map_err(CaptureError::device(Stage::Configure))?;
            info!("Camera accepted reduced capture options");
            Ok(OptionSet::Reduced)
        }
        Err(e) => Err(CaptureError::device(Stage::Configure)(e)),
    }
}
