//! Detected findings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use super::{LogEntry, ValidationError};

/// Anomaly severity (ordered from lowest to highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyLevel::Low => "LOW",
            AnomalyLevel::Medium => "MEDIUM",
            AnomalyLevel::High => "HIGH",
            AnomalyLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AnomalyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(AnomalyLevel::Low),
            "medium" => Ok(AnomalyLevel::Medium),
            "high" => Ok(AnomalyLevel::High),
            "critical" => Ok(AnomalyLevel::Critical),
            _ => Err(ValidationError::UnknownLevel(s.to_string())),
        }
    }
}

/// A reported finding with its supporting evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnomalyRecord")]
pub struct Anomaly {
    level: AnomalyLevel,
    score: f64,
    #[serde(rename = "type")]
    kind: String,
    evidence: Vec<Arc<LogEntry>>,
    description: String,
}

#[derive(Deserialize)]
struct AnomalyRecord {
    level: AnomalyLevel,
    score: f64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    evidence: Vec<Arc<LogEntry>>,
    description: String,
}

impl TryFrom<AnomalyRecord> for Anomaly {
    type Error = ValidationError;

    fn try_from(record: AnomalyRecord) -> Result<Self, Self::Error> {
        Anomaly::new(
            record.level,
            record.score,
            record.kind,
            record.evidence,
            record.description,
        )
    }
}

impl Anomaly {
    /// Create an anomaly, checking the score range and required strings.
    ///
    /// Evidence may be empty here; the detectors only ever emit anomalies
    /// that cite at least one entry.
    pub fn new(
        level: AnomalyLevel,
        score: f64,
        kind: impl Into<String>,
        evidence: Vec<Arc<LogEntry>>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange(score));
        }

        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(ValidationError::EmptyField("type"));
        }

        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }

        Ok(Anomaly {
            level,
            score,
            kind,
            evidence,
            description,
        })
    }

    pub fn level(&self) -> AnomalyLevel {
        self.level
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Type tag, e.g. "brute_force"
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn evidence(&self) -> &[Arc<LogEntry>] {
        &self.evidence
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_critical(&self) -> bool {
        self.level == AnomalyLevel::Critical
    }

    /// First source address found in the evidence
    pub fn primary_source(&self) -> Option<IpAddr> {
        self.evidence.iter().find_map(|entry| entry.source_address())
    }
}
