//! Open Spherical Camera (OSC) Control Protocol
//!
//! This crate provides the JSON-over-HTTP request primitive used to drive a
//! panoramic camera, plus the wire types exchanged with it: option sets,
//! command handles and command status records.

mod channel;
mod error;
mod protocol;

pub use channel::{
    truncate_body, DeviceChannel, HttpChannel, BODY_EXCERPT_CHARS, DEFAULT_DOWNLOAD_TIMEOUT,
};
pub use error::OscError;
pub use protocol::{CaptureOptions, CommandHandle, CommandState, CommandStatus};

/// Device endpoint paths
pub mod endpoint {
    /// Device identity and capability descriptor (GET)
    pub const INFO: &str = "/osc/info";
    /// Current device state snapshot (POST)
    pub const STATE: &str = "/osc/state";
    /// Command execution (POST)
    pub const EXECUTE: &str = "/osc/commands/execute";
    /// Asynchronous command status (POST)
    pub const STATUS: &str = "/osc/commands/status";
}

/// Command names understood by `commands/execute`
pub mod command {
    /// Apply capture options
    pub const SET_OPTIONS: &str = "camera.setOptions";
    /// Fire the shutter
    pub const TAKE_PICTURE: &str = "camera.takePicture";
}
