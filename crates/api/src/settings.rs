//! Layered runtime settings
//!
//! Precedence, lowest first: built-in defaults, the optional `capture.toml`
//! file, `APP_*` environment variables (`APP_CAPTURE__DEVICE_HOST`,
//! `APP_SERVER__PORT`, ...), then the legacy `INSTA360_HOST` and `PORT`
//! variables.

use capture::CaptureConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default settings file, looked up relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "capture";

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete host settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub capture: CaptureConfig,
}

impl Settings {
    /// Load settings from `capture.toml` and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_from(DEFAULT_SETTINGS_FILE, &env)
    }

    /// Load settings from `file` (extension optional, may be absent) and `env`
    pub fn load_from(file: &str, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.clone())),
            )
            .set_override_option("capture.device_host", env.get("INSTA360_HOST").cloned())?
            .set_override_option("server.port", env.get("PORT").cloned())?
            .build()?
            .try_deserialize()
    }
}
