use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ScanError;

/// Scanner configuration
///
/// Every key is optional; a missing section or key takes its default and
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule thresholds
    pub thresholds: ThresholdConfig,
    /// Statistical outlier detection
    pub outlier: OutlierConfig,
}

/// Rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Failed logins per source address that must be exceeded to report brute force
    pub login_fails: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig { login_fails: 10 }
    }
}

/// How the per-source failure-rate feature is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureRateMode {
    /// Failures so far for the source over entries processed so far
    #[default]
    Running,
    /// Total failures for the source over total entries
    Global,
}

/// Isolation forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Expected fraction of outliers, in (0, 0.5]
    pub contamination: f64,
    /// Below this many entries no statistical analysis is done
    pub min_entries: usize,
    /// Number of isolation trees
    pub trees: usize,
    /// Subsample size per tree
    pub sample_size: usize,
    /// Seed for tree construction
    pub seed: u64,
    pub failure_rate: FailureRateMode,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        OutlierConfig {
            contamination: 0.05,
            min_entries: 10,
            trees: 100,
            sample_size: 256,
            seed: 42,
            failure_rate: FailureRateMode::Running,
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// The file must exist; a missing file is `ScanError::NotFound`.
    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        if !path.exists() {
            return Err(ScanError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        Self::from_toml(&contents).map_err(|reason| ScanError::Configuration {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Decode and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ScanError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ScanError::Configuration {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, contents).map_err(|e| ScanError::io(path, e))
    }

    fn validate(&self) -> Result<(), String> {
        let outlier = &self.outlier;
        if !(outlier.contamination > 0.0 && outlier.contamination <= 0.5) {
            return Err(format!(
                "outlier.contamination must be in (0, 0.5], got {}",
                outlier.contamination
            ));
        }
        if outlier.trees == 0 {
            return Err("outlier.trees must be at least 1".to_string());
        }
        if outlier.sample_size < 2 {
            return Err("outlier.sample_size must be at least 2".to_string());
        }
        Ok(())
    }
}
