use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{PlateError, Result};

/// Parameters of the contour based plate search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub bilateral_diameter: i32,
    pub bilateral_sigma_color: f64,
    pub bilateral_sigma_space: f64,
    pub canny_low: f64,
    pub canny_high: f64,
    /// Only the largest contours by area are considered.
    pub max_candidates: usize,
    pub approx_epsilon: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 11,
            bilateral_sigma_color: 17.0,
            bilateral_sigma_space: 17.0,
            canny_low: 30.0,
            canny_high: 200.0,
            max_candidates: 10,
            approx_epsilon: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory holding the `.traineddata` files, Tesseract's default when unset.
    pub data_path: Option<String>,
    pub language: String,
    pub char_whitelist: Option<String>,
    pub page_seg_mode: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            language: "eng".to_string(),
            char_whitelist: None,
            // Treat the crop as a single line of text.
            page_seg_mode: "7".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reference_path: PathBuf,
    pub history_path: PathBuf,
    pub camera_index: i32,
    pub preview_interval_ms: u64,
    pub actuator_port: Option<PathBuf>,
    pub actuator_settle_ms: u64,
    pub ocr: OcrConfig,
    pub locator: LocatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reference_path: PathBuf::from("reference_plates.json"),
            history_path: PathBuf::from("plate_history.json"),
            camera_index: 0,
            preview_interval_ms: 10,
            actuator_port: None,
            actuator_settle_ms: 2000,
            ocr: OcrConfig::default(),
            locator: LocatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let config_error = |message: String| PlateError::Config {
            path: path.to_path_buf(),
            message,
        };
        let contents = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config = serde_json::from_str(&contents).map_err(|e| config_error(e.to_string()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}
