//! PETRA: flags brute force and unusual timing in authentication logs.

pub mod config;
pub mod detection;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use config::{Config, FailureRateMode};
pub use detection::{BruteForceDetector, IsolationForest, OutlierDetector};
pub use error::ScanError;
pub use input::{AuthLogParser, DiagnosticSink, LogSink, MemorySink};
pub use models::{Anomaly, AnomalyLevel, LogEntry, ValidationError};
pub use output::{OutputFormat, OutputHandler};
pub use pipeline::ScanPipeline;
