//! Statistical detection of unusual login timing
//!
//! Entries are turned into `[hour_of_day, failure_rate]` features,
//! standardized, and scored by an outlier model. All flagged entries are
//! reported together as one "unusual_timing" anomaly.

use std::sync::Arc;

use super::features;
use super::isolation_forest::{IsolationForest, OutlierModel};
use crate::config::{FailureRateMode, OutlierConfig};
use crate::models::{Anomaly, AnomalyLevel, LogEntry, ValidationError};

pub const UNUSUAL_TIMING: &str = "unusual_timing";

/// Mean score at or above which the finding is HIGH rather than MEDIUM
const HIGH_SCORE: f64 = 0.5;

pub struct OutlierDetector {
    min_entries: usize,
    failure_rate: FailureRateMode,
    model: Box<dyn OutlierModel + Send + Sync>,
}

impl OutlierDetector {
    /// Isolation forest detector with the default settings
    pub fn new() -> Self {
        Self::from_config(&OutlierConfig::default())
    }

    pub fn from_config(config: &OutlierConfig) -> Self {
        let forest = IsolationForest::new(
            config.trees,
            config.sample_size,
            config.contamination,
            config.seed,
        );
        Self::with_model(config.min_entries, config.failure_rate, Box::new(forest))
    }

    /// Use any outlier model
    pub fn with_model(
        min_entries: usize,
        failure_rate: FailureRateMode,
        model: Box<dyn OutlierModel + Send + Sync>,
    ) -> Self {
        OutlierDetector {
            min_entries,
            failure_rate,
            model,
        }
    }

    /// At most one anomaly aggregating every flagged entry
    ///
    /// Too few entries, or no flagged entries, give an empty list.
    pub fn detect(&self, entries: &[Arc<LogEntry>]) -> Result<Vec<Anomaly>, ValidationError> {
        if entries.len() < self.min_entries {
            log::debug!(
                "Skipping outlier detection: {} entries (minimum {})",
                entries.len(),
                self.min_entries
            );
            return Ok(Vec::new());
        }

        let points = features::standardize(&features::extract(entries, self.failure_rate));
        let scores = self.model.fit_score(&points);

        let mut evidence = Vec::new();
        let mut total = 0.0;
        for (entry, score) in entries.iter().zip(&scores) {
            if score.is_outlier {
                evidence.push(Arc::clone(entry));
                total += score.score;
            }
        }

        if evidence.is_empty() {
            return Ok(Vec::new());
        }

        let count = evidence.len();
        let mean = (total / count as f64).clamp(0.0, 1.0);
        let level = if mean < HIGH_SCORE {
            AnomalyLevel::Medium
        } else {
            AnomalyLevel::High
        };

        log::debug!("Outlier detection flagged {} of {} entries", count, entries.len());

        let anomaly = Anomaly::new(
            level,
            mean,
            UNUSUAL_TIMING,
            evidence,
            format!(
                "{} outlier entries found at unusual times or failure rates. Ref: NIST SP 800-61",
                count
            ),
        )?;
        Ok(vec![anomaly])
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::features::Point;
    use crate::detection::isolation_forest::OutlierScore;
    use crate::models::EVENT_LOGIN;
    use chrono::NaiveDate;

    /// Flags the given indices with a fixed score
    struct FixedModel {
        flagged: Vec<usize>,
        score: f64,
    }

    impl OutlierModel for FixedModel {
        fn fit_score(&self, points: &[Point]) -> Vec<OutlierScore> {
            (0..points.len())
                .map(|i| OutlierScore {
                    score: if self.flagged.contains(&i) { self.score } else { 0.1 },
                    is_outlier: self.flagged.contains(&i),
                })
                .collect()
        }
    }

    fn create_entry(ip: &str, hour: u32, minute: u32, success: bool) -> Arc<LogEntry> {
        let timestamp = NaiveDate::from_ymd_opt(2025, 11, 12)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        Arc::new(
            LogEntry::new(timestamp, EVENT_LOGIN)
                .unwrap()
                .with_source_address(ip.parse().unwrap())
                .with_success(success),
        )
    }

    fn office_hours(count: u32) -> Vec<Arc<LogEntry>> {
        (0..count)
            .map(|i| create_entry(&format!("10.0.0.{}", i % 5 + 1), 9 + i % 3, (i * 7) % 60, true))
            .collect()
    }

    fn fixed(flagged: Vec<usize>, score: f64) -> OutlierDetector {
        OutlierDetector::with_model(10, FailureRateMode::Running, Box::new(FixedModel { flagged, score }))
    }

    #[test]
    fn test_too_few_entries() {
        let detector = fixed(vec![0, 1, 2], 0.9);
        assert!(detector.detect(&office_hours(9)).unwrap().is_empty());
        assert!(OutlierDetector::new().detect(&office_hours(9)).unwrap().is_empty());
        assert!(OutlierDetector::new().detect(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_no_flags_no_anomaly() {
        let detector = fixed(vec![], 0.9);
        assert!(detector.detect(&office_hours(20)).unwrap().is_empty());
    }

    #[test]
    fn test_flags_aggregate_into_one_anomaly() {
        let entries = office_hours(20);
        let detector = fixed(vec![3, 11], 0.7);

        let anomalies = detector.detect(&entries).unwrap();
        assert_eq!(anomalies.len(), 1);

        let anomaly = &anomalies[0];
        assert_eq!(anomaly.kind(), "unusual_timing");
        assert_eq!(anomaly.level(), AnomalyLevel::High);
        assert_eq!(anomaly.score(), 0.7);
        assert_eq!(anomaly.evidence().len(), 2);
        assert!(Arc::ptr_eq(&anomaly.evidence()[0], &entries[3]));
        assert!(Arc::ptr_eq(&anomaly.evidence()[1], &entries[11]));
        assert!(anomaly.description().starts_with("2 outlier entries"));
    }

    #[test]
    fn test_low_mean_score_is_medium() {
        let anomalies = fixed(vec![0], 0.42).detect(&office_hours(12)).unwrap();
        assert_eq!(anomalies[0].level(), AnomalyLevel::Medium);
        assert_eq!(anomalies[0].score(), 0.42);
    }

    #[test]
    fn test_night_failure_is_flagged() {
        let mut entries = office_hours(30);
        let intruder = create_entry("203.0.113.50", 3, 12, false);
        entries.push(intruder.clone());

        let anomalies = OutlierDetector::new().detect(&entries).unwrap();
        assert_eq!(anomalies.len(), 1);

        let anomaly = &anomalies[0];
        assert!(anomaly.evidence().iter().any(|e| Arc::ptr_eq(e, &intruder)));
        assert!((0.0..=1.0).contains(&anomaly.score()));
        assert!(anomaly.description().contains("NIST SP 800-61"));
    }

    #[test]
    fn test_uniform_batch_is_quiet() {
        let entries: Vec<Arc<LogEntry>> =
            (0..25).map(|_| create_entry("10.0.0.1", 10, 0, true)).collect();
        assert!(OutlierDetector::new().detect(&entries).unwrap().is_empty());
    }
}
