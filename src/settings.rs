use crate::persist::{SaveFile, SaveFileError};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// redb file holding users and boards.
    pub save_file_path: String,
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` overrides it.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            save_file_path: "board.redb".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Settings {
    /// Load `settings.json` from the working directory.
    pub fn load() -> Result<Settings, SettingsError> {
        Settings::load_from(SETTINGS_FILENAME)
    }

    /// A missing file means defaults; a malformed one is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn open_save_file(&self) -> Result<SaveFile, SaveFileError> {
        SaveFile::open(&self.save_file_path)
    }
}

/// Install the global fmt subscriber. Later calls are no-ops.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
