//! Per-line parse diagnostics
//!
//! The parser never fails on a bad line. It reports the line to a
//! `DiagnosticSink` handed to it at construction and moves on.

use std::fmt;
use std::sync::Mutex;

/// Why a line was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Line does not match the auth log syntax
    Malformed,
    /// Header matched but did not form a valid calendar instant
    InvalidTimestamp(String),
    /// Line is not valid UTF-8
    InvalidEncoding,
    /// The source failed to read; iteration stops here
    Read(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Malformed => write!(f, "line does not match auth log format"),
            ParseFailure::InvalidTimestamp(ts) => write!(f, "invalid timestamp '{}'", ts),
            ParseFailure::InvalidEncoding => write!(f, "line is not valid UTF-8"),
            ParseFailure::Read(e) => write!(f, "read error: {}", e),
        }
    }
}

/// One skipped line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// 1-based line number
    pub line_number: usize,
    pub failure: ParseFailure,
    pub line: String,
}

/// Receiver for skipped-line reports
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: ParseDiagnostic);
}

/// Sink that forwards every diagnostic to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, diagnostic: ParseDiagnostic) {
        log::warn!(
            "Skipping line {}: {}: {}",
            diagnostic.line_number,
            diagnostic.failure,
            diagnostic.line
        );
    }
}

/// Sink that keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    diagnostics: Mutex<Vec<ParseDiagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn diagnostics(&self) -> Vec<ParseDiagnostic> {
        match self.diagnostics.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: ParseDiagnostic) {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
