// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{calibration, overlay};
use crate::errors::{AppError, AppResult};
use crate::mode::ModeSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the platform config dir
const APP_DIR: &str = "tof-calibrator";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root under which the calibration directory is created
    /// (defaults to the documents dir, then home)
    pub storage_root: Option<PathBuf>,
    /// Which mode layout the controller runs with
    pub mode_set: ModeSet,
    /// Projector display width used for the test overlay
    pub projector_width: u32,
    /// Projector display height used for the test overlay
    pub projector_height: u32,
    /// Initial value of the orientation flag
    pub flip_on_start: bool,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: None,
            mode_set: ModeSet::default(),
            projector_width: overlay::PROJECTOR_WIDTH,
            projector_height: overlay::PROJECTOR_HEIGHT,
            flip_on_start: true, // the camera is mounted upside down on the projector rig
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load the config from a specific file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Directory where calibration files are written and looked up
    pub fn calibration_dir(&self) -> PathBuf {
        let root = self
            .storage_root
            .clone()
            .or_else(dirs::document_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        root.join(calibration::DIR_NAME)
    }

    /// Projector display size as (width, height)
    pub fn projector_size(&self) -> (u32, u32) {
        (self.projector_width, self.projector_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_dir_uses_storage_root() {
        let config = Config {
            storage_root: Some(PathBuf::from("/sdcard")),
            ..Config::default()
        };
        assert_eq!(config.calibration_dir(), PathBuf::from("/sdcard/Calibrator"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{ "flip_on_start": false }"#).unwrap();
        assert!(!config.flip_on_start);
        assert_eq!(config.projector_size(), (1280, 720));
        assert_eq!(config.mode_set, ModeSet::Calibrator);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = serde_json::from_str::<Config>("{ not json").map_err(AppError::from);
        assert!(matches!(err, Err(AppError::Config(_))));
    }
}
