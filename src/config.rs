//! Run configuration, constructed once and read-only afterwards

use crate::core::calibrate::DEFAULT_CALIBRATION_FACTOR;
use crate::core::polarimetry::VhHandling;
use crate::types::{Device, PolSarError, PolSarResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Processing configuration for a catalog of scenes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Directory holding one sub-directory per acquisition
    pub data_dir: PathBuf,
    /// Root of the local scene cache
    pub local_dir: PathBuf,
    /// Path from a scene directory to its per-date calibrated rasters
    pub calibrated_subdir: PathBuf,
    /// Regex matched against raster file names
    pub coefficient_pattern: String,
    /// Position of the date token in `_`-separated scene directory names
    pub date_token_index: usize,
    pub calibration_factor: f64,
    pub vh_handling: VhHandling,
    pub compute_t: bool,
    pub compute_c: bool,
    /// Ignore cached records and recompute from the rasters
    pub force_reload: bool,
    pub device: Device,
    /// Refuse to save scenes that are not calibrated
    pub require_calibrated_save: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        let local_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".local"))
            .join("polsar");
        Self {
            data_dir: PathBuf::from("data"),
            local_dir,
            calibrated_subdir: PathBuf::from("data").join("calibrated"),
            coefficient_pattern: r"sli.*\.tif$".to_string(),
            date_token_index: 3,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            vh_handling: VhHandling::default(),
            compute_t: true,
            compute_c: true,
            force_reload: false,
            device: Device::default(),
            require_calibrated_save: true,
        }
    }
}

impl ProcessorConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PolSarResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PolSarError::MissingConfig(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> PolSarResult<()> {
        if !self.calibration_factor.is_finite() || self.calibration_factor <= 0.0 {
            return Err(PolSarError::InvalidParameter(format!(
                "calibration_factor must be positive, got {}",
                self.calibration_factor
            )));
        }
        self.coefficient_regex()?;
        Ok(())
    }

    pub fn coefficient_regex(&self) -> PolSarResult<Regex> {
        Regex::new(&self.coefficient_pattern).map_err(|e| {
            PolSarError::InvalidParameter(format!(
                "invalid coefficient_pattern {}: {}",
                self.coefficient_pattern, e
            ))
        })
    }
}
