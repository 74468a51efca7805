use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::detect::ContourDetector;
use crate::editing::DEFAULT_ROW_TOLERANCE;
use crate::geometry::DEFAULT_CONTAINMENT_THRESHOLD;

pub const SETTINGS_DIR: &str = "config";
pub const SETTINGS_FILE: &str = "config/settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Share of a panel that must lie inside another before pruning drops it.
    pub containment_threshold: f64,
    /// Maximum difference between panel tops within one row, in pixels.
    pub row_tolerance: i32,
    pub detector: ContourDetector,
    pub state_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            containment_threshold: DEFAULT_CONTAINMENT_THRESHOLD,
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            detector: ContourDetector::default(),
            state_file: PathBuf::from("comic_state.json"),
        }
    }
}

impl Settings {
    /// Loads `config/settings.json`, writing the defaults there on first use.
    pub fn load() -> Result<Self> {
        fs::create_dir_all(SETTINGS_DIR).context("Config directory creation failed")?;
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            fs::write(path, serde_json::to_string_pretty(&settings)?)
                .with_context(|| format!("Settings file creation failed: {path:?}"))?;
            info!("Created default settings at {path:?}");
            return Ok(settings);
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Could not read {path:?}"))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid settings in {path:?}"))
    }
}
