//! Feature extraction for the statistical detector
//!
//! Each entry becomes `[hour_of_day, failure_rate_for_source]`, then every
//! dimension is standardized across the batch.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Timelike;

use crate::config::FailureRateMode;
use crate::models::LogEntry;

/// One feature vector
pub type Point = [f64; 2];

/// Raw feature vectors, one per entry, in input order
///
/// Entries without a source address share one bucket.
pub fn extract(entries: &[Arc<LogEntry>], mode: FailureRateMode) -> Vec<Point> {
    let rates = match mode {
        FailureRateMode::Running => running_failure_rates(entries),
        FailureRateMode::Global => global_failure_rates(entries),
    };

    entries
        .iter()
        .zip(rates)
        .map(|(entry, rate)| [hour_of_day(entry), rate])
        .collect()
}

/// Fractional hour, e.g. 17:30 -> 17.5
pub fn hour_of_day(entry: &LogEntry) -> f64 {
    let ts = entry.timestamp();
    ts.hour() as f64 + ts.minute() as f64 / 60.0
}

/// Failures seen so far for the entry's source over entries seen so far
///
/// Depends on input order: the same entries in another order give other
/// values.
fn running_failure_rates(entries: &[Arc<LogEntry>]) -> Vec<f64> {
    let mut failures: HashMap<Option<IpAddr>, usize> = HashMap::new();

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let count = failures.entry(entry.source_address()).or_insert(0);
            if !entry.success() {
                *count += 1;
            }
            *count as f64 / (index + 1) as f64
        })
        .collect()
}

/// Total failures for the entry's source over total entries
fn global_failure_rates(entries: &[Arc<LogEntry>]) -> Vec<f64> {
    let mut failures: HashMap<Option<IpAddr>, usize> = HashMap::new();
    for entry in entries.iter().filter(|e| !e.success()) {
        *failures.entry(entry.source_address()).or_insert(0) += 1;
    }

    let total = entries.len().max(1) as f64;
    entries
        .iter()
        .map(|entry| failures.get(&entry.source_address()).copied().unwrap_or(0) as f64 / total)
        .collect()
}

/// Z-score standardization per dimension (population standard deviation)
///
/// A dimension with no variance maps to all zeros.
pub fn standardize(points: &[Point]) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }

    let n = points.len() as f64;
    let mut mean = [0.0; 2];
    let mut std_dev = [0.0; 2];

    for dim in 0..2 {
        mean[dim] = points.iter().map(|p| p[dim]).sum::<f64>() / n;
        let variance = points
            .iter()
            .map(|p| (p[dim] - mean[dim]).powi(2))
            .sum::<f64>()
            / n;
        std_dev[dim] = variance.sqrt();
    }

    points
        .iter()
        .map(|p| {
            let mut z = [0.0; 2];
            for dim in 0..2 {
                if std_dev[dim] > f64::EPSILON {
                    z[dim] = (p[dim] - mean[dim]) / std_dev[dim];
                }
            }
            z
        })
        .collect()
}
