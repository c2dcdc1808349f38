use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use revolve_core::DEFAULT_GREETING;
use revolve_engine::{Passthrough, RequestShape, TransportSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "./revolve.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid passthrough block: {0}")]
    Passthrough(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub request_shape: RequestShape,
    pub connect_timeout_secs: u64,
    /// No deadline when absent: agent runs can take minutes.
    pub request_timeout_secs: Option<u64>,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub greeting: String,
    /// Database connection parameters forwarded verbatim as `dbConfig`.
    pub db_config: BTreeMap<String, String>,
    /// Forwarded verbatim as `settings`.
    pub settings: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let transport = TransportSettings::default();
        Self {
            endpoint: transport.endpoint,
            request_shape: transport.request_shape,
            connect_timeout_secs: transport.connect_timeout.as_secs(),
            request_timeout_secs: None,
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            db_config: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            request_shape: self.request_shape,
        }
    }

    pub fn passthrough(&self) -> Result<Passthrough, ConfigError> {
        Ok(Passthrough {
            db_config: serde_json::to_value(&self.db_config)?,
            settings: serde_json::to_value(&self.settings)?,
        })
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Loads the config file; `Ok(None)` when it does not exist.
pub fn load(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
