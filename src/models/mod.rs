pub mod anomaly;
pub mod log_entry;

pub use anomaly::{Anomaly, AnomalyLevel};
pub use log_entry::{LogEntry, EVENT_LOGIN, EVENT_OTHER};

use thiserror::Error;

/// Out-of-contract values passed to a model constructor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("score {0} is outside [0.0, 1.0]")]
    ScoreOutOfRange(f64),

    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("unknown anomaly level: {0}")]
    UnknownLevel(String),
}
