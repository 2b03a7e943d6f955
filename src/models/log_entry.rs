//! Parsed authentication event
//!
//! A `LogEntry` is created once by the parser and then shared (behind an
//! `Arc`) by every anomaly that cites it as evidence. Fields are private
//! and only readable through getters, so an entry cannot change after it
//! has been handed out.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::ValidationError;

/// Event type for password-based credential exchanges
pub const EVENT_LOGIN: &str = "login";
/// Event type for everything else
pub const EVENT_OTHER: &str = "other";

/// One structured, immutable authentication event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LogEntryRecord")]
pub struct LogEntry {
    timestamp: NaiveDateTime,
    user: Option<String>,
    source_address: Option<IpAddr>,
    event_type: String,
    success: bool,
    details: Option<String>,
}

/// Wire shape of a `LogEntry`, validated on the way in
#[derive(Deserialize)]
struct LogEntryRecord {
    timestamp: NaiveDateTime,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    source_address: Option<IpAddr>,
    event_type: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    details: Option<String>,
}

impl TryFrom<LogEntryRecord> for LogEntry {
    type Error = ValidationError;

    fn try_from(record: LogEntryRecord) -> Result<Self, Self::Error> {
        let mut entry = LogEntry::new(record.timestamp, record.event_type)?;
        entry.user = record.user;
        entry.source_address = record.source_address;
        entry.success = record.success;
        entry.details = record.details;
        Ok(entry)
    }
}

impl LogEntry {
    /// Create an entry with only the required fields.
    ///
    /// `success` starts out false; every optional field starts out absent.
    pub fn new(
        timestamp: NaiveDateTime,
        event_type: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("event_type"));
        }

        Ok(LogEntry {
            timestamp,
            user: None,
            source_address: None,
            event_type,
            success: false,
            details: None,
        })
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_source_address(mut self, address: IpAddr) -> Self {
        self.source_address = Some(address);
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn source_address(&self) -> Option<IpAddr> {
        self.source_address
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// True for a password exchange that was not accepted
    pub fn is_failed_login(&self) -> bool {
        self.event_type == EVENT_LOGIN && !self.success
    }
}
