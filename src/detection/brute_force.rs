//! Brute force detection
//!
//! Counts failed password logins per source address over a whole scan and
//! reports every address whose count exceeds the configured threshold.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::models::{Anomaly, AnomalyLevel, LogEntry, ValidationError};

pub const BRUTE_FORCE: &str = "brute_force";

/// At or above this many failures an address is critical
const CRITICAL_FAILURES: usize = 50;
/// Failure count at which the confidence score saturates
const SCORE_SATURATION: f64 = 100.0;

/// Detects repeated failed logins from one source address
#[derive(Debug, Clone)]
pub struct BruteForceDetector {
    /// Failures per address that must be exceeded
    threshold: usize,
}

impl BruteForceDetector {
    /// Create a detector with the default threshold of 10
    pub fn new() -> Self {
        BruteForceDetector { threshold: 10 }
    }

    pub fn with_threshold(threshold: usize) -> Self {
        BruteForceDetector { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// One anomaly per address over the threshold, in first-seen address order
    pub fn detect(&self, entries: &[Arc<LogEntry>]) -> Result<Vec<Anomaly>, ValidationError> {
        let mut order: Vec<IpAddr> = Vec::new();
        let mut failures: HashMap<IpAddr, Vec<Arc<LogEntry>>> = HashMap::new();

        for entry in entries.iter().filter(|e| e.is_failed_login()) {
            let Some(address) = entry.source_address() else {
                continue;
            };
            failures
                .entry(address)
                .or_insert_with(|| {
                    order.push(address);
                    Vec::new()
                })
                .push(Arc::clone(entry));
        }

        let mut anomalies = Vec::new();
        for address in order {
            let Some(evidence) = failures.remove(&address) else {
                continue;
            };
            let count = evidence.len();
            if count <= self.threshold {
                continue;
            }

            log::debug!(
                "Brute force: {} failed logins from {} (threshold {})",
                count,
                address,
                self.threshold
            );

            anomalies.push(Anomaly::new(
                Self::level_for(count),
                Self::score_for(count),
                BRUTE_FORCE,
                evidence,
                format!(
                    "{} failed logins from {} (threshold {}). Ref: NIST SP 800-63B",
                    count, address, self.threshold
                ),
            )?);
        }

        Ok(anomalies)
    }

    fn level_for(count: usize) -> AnomalyLevel {
        if count < CRITICAL_FAILURES {
            AnomalyLevel::High
        } else {
            AnomalyLevel::Critical
        }
    }

    fn score_for(count: usize) -> f64 {
        (count as f64 / SCORE_SATURATION).min(1.0)
    }
}

impl Default for BruteForceDetector {
    fn default() -> Self {
        Self::new()
    }
}
