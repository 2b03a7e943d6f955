//! Scan orchestration
//!
//! Parses a log once, runs the brute force rule and then the outlier
//! detector over the same entries, and returns their findings in that
//! order. Findings are not deduplicated across detectors.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::detection::{BruteForceDetector, OutlierDetector};
use crate::error::ScanError;
use crate::input::{AuthLogParser, DiagnosticSink, LogSink};
use crate::models::{Anomaly, LogEntry};

pub struct ScanPipeline {
    config: Config,
    sink: Arc<dyn DiagnosticSink>,
    year: Option<i32>,
    brute_force: BruteForceDetector,
    outlier: OutlierDetector,
}

impl ScanPipeline {
    /// Build a pipeline from an in-memory configuration
    pub fn new(config: Config) -> Self {
        let brute_force = BruteForceDetector::with_threshold(config.thresholds.login_fails);
        let outlier = OutlierDetector::from_config(&config.outlier);

        ScanPipeline {
            config,
            sink: Arc::new(LogSink),
            year: None,
            brute_force,
            outlier,
        }
    }

    /// Load the configuration file and build a pipeline
    ///
    /// Fails before anything is parsed if the file is missing or invalid.
    pub fn from_config_file(path: &Path) -> Result<Self, ScanError> {
        let config = Config::from_file(path)?;
        log::info!(
            "Loaded configuration from {:?} (login_fails threshold {})",
            path,
            config.thresholds.login_fails
        );
        Ok(Self::new(config))
    }

    /// Send skipped-line reports to `sink` instead of the log
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Pin the year stamped on parsed entries
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse `log_path` and return all findings, rule-based first
    pub fn scan(&self, log_path: &Path) -> Result<Vec<Anomaly>, ScanError> {
        let mut parser = AuthLogParser::with_sink(Arc::clone(&self.sink));
        if let Some(year) = self.year {
            parser = parser.with_year(year);
        }

        let mut parsed = parser.parse_file(log_path)?;
        let entries: Vec<Arc<LogEntry>> = parsed.by_ref().map(Arc::new).collect();
        let stats = parsed.stats();

        log::info!(
            "Parsed {} entries from {:?} ({} lines skipped)",
            stats.parsed,
            log_path,
            stats.skipped
        );

        self.scan_entries(&entries)
    }

    /// Run both detectors over entries that are already materialized
    pub fn scan_entries(&self, entries: &[Arc<LogEntry>]) -> Result<Vec<Anomaly>, ScanError> {
        let mut anomalies = self.brute_force.detect(entries)?;
        let rule_count = anomalies.len();
        anomalies.extend(self.outlier.detect(entries)?);

        log::info!(
            "Scan found {} anomalies ({} rule-based, {} statistical)",
            anomalies.len(),
            rule_count,
            anomalies.len() - rule_count
        );
        Ok(anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyLevel, EVENT_LOGIN};
    use chrono::NaiveDate;

    fn failures(ip: &str, count: usize) -> Vec<Arc<LogEntry>> {
        let timestamp = NaiveDate::from_ymd_opt(2025, 11, 12)
            .unwrap()
            .and_hms_opt(17, 39, 12)
            .unwrap();
        (0..count)
            .map(|_| {
                Arc::new(
                    LogEntry::new(timestamp, EVENT_LOGIN)
                        .unwrap()
                        .with_source_address(ip.parse().unwrap()),
                )
            })
            .collect()
    }

    fn pipeline(threshold: usize) -> ScanPipeline {
        let mut config = Config::default();
        config.thresholds.login_fails = threshold;
        ScanPipeline::new(config)
    }

    #[test]
    fn test_scan_basic_detection() {
        let anomalies = pipeline(5).scan_entries(&failures("192.168.1.1", 6)).unwrap();

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].level(), AnomalyLevel::High);
        assert_eq!(anomalies[0].kind(), "brute_force");
        assert_eq!(anomalies[0].evidence().len(), 6);
        assert_eq!(anomalies[0].score(), 0.06);
    }

    #[test]
    fn test_scan_no_anomalies() {
        assert!(pipeline(5).scan_entries(&failures("192.168.1.1", 4)).unwrap().is_empty());
    }

    #[test]
    fn test_scan_multiple_ips() {
        let mut entries = failures("1.1.1.1", 6);
        entries.extend(failures("2.2.2.2", 3));
        assert_eq!(pipeline(5).scan_entries(&entries).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_config() {
        let result = ScanPipeline::from_config_file(Path::new("nonexistent.toml"));
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_missing_log() {
        let result = pipeline(5).scan(Path::new("nonexistent.log"));
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }
}
