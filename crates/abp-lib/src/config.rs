use crate::{detectors::PeakDetectorConfig, filters::FilterConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Everything a pipeline run needs besides the raw signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lower bound of the physiologically valid range (signal unit)
    pub range_min: f64,
    /// Upper bound of the physiologically valid range (signal unit)
    pub range_max: f64,
    /// Fill range gaps by linear interpolation before filtering.
    pub interpolate_gaps: bool,
    pub filter: FilterConfig,
    pub peaks: PeakDetectorConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            range_min: 60.0,
            range_max: 180.0,
            interpolate_gaps: false,
            filter: FilterConfig::default(),
            peaks: PeakDetectorConfig::default(),
        }
    }
}

pub fn parse_config(text: &str) -> Result<AnalysisConfig> {
    toml::from_str(text).context("parsing analysis config")
}

/// Read a TOML config; absent keys keep their defaults.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AnalysisConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::debug!("loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
