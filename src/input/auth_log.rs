//! auth.log parser
//!
//! Reads sshd/PAM style lines:
//!
//! ```text
//! Nov 12 17:39:12 server sshd[1234]: Failed password for admin from 192.168.1.1 port 22 ssh2
//! ```
//!
//! The format carries no year, so the parser stamps every entry with the
//! year it was constructed in (or the one pinned with `with_year`). A log
//! that spans New Year will be misdated.

use chrono::{Datelike, Local, NaiveDateTime};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use super::diagnostics::{DiagnosticSink, LogSink, ParseDiagnostic, ParseFailure};
use crate::error::ScanError;
use crate::models::{LogEntry, EVENT_LOGIN, EVENT_OTHER};

const LINE_PATTERN: &str = r"^(?P<month>[A-Za-z]{3})\s+(?P<day>\d{1,2})\s+(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})\s+(?P<host>[\w.-]+)\s+(?P<service>[\w.-]+)\[(?P<pid>\d+)\]:\s*(?P<event>.*)$";
const USER_PATTERN: &str = r"for (?:invalid user )?(?P<user>[\w.-]+) from";
const ADDRESS_PATTERN: &str = r"from (?P<address>[0-9A-Fa-f:.]+)";

const TIMESTAMP_FORMAT: &str = "%Y %b %d %H:%M:%S";

/// Marker sshd writes for a successful authentication
const SUCCESS_MARKER: &str = "Accepted";
/// Marker for a password-based credential exchange
const PASSWORD_MARKER: &str = "password";

/// Parser for auth.log lines
pub struct AuthLogParser {
    line_pattern: Regex,
    user_pattern: Regex,
    address_pattern: Regex,
    year: i32,
    sink: Arc<dyn DiagnosticSink>,
}

/// Counts of what an iteration has seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub parsed: usize,
    pub skipped: usize,
}

impl AuthLogParser {
    /// Create a parser that reports skipped lines through `log`
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    /// Create a parser that reports skipped lines to `sink`
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        AuthLogParser {
            line_pattern: Regex::new(LINE_PATTERN).expect("line pattern is valid"),
            user_pattern: Regex::new(USER_PATTERN).expect("user pattern is valid"),
            address_pattern: Regex::new(ADDRESS_PATTERN).expect("address pattern is valid"),
            year: Local::now().year(),
            sink,
        }
    }

    /// Pin the year stamped on every entry
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Open `path` and return a lazy iterator over its entries
    ///
    /// Existence is checked here, before any line is read. Every call
    /// re-opens the file.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedEntries<'_, BufReader<File>>, ScanError> {
        if !path.exists() {
            return Err(ScanError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        log::debug!("Parsing auth log {:?} (year {})", path, self.year);
        Ok(self.parse_reader(BufReader::new(file)))
    }

    /// Lazy iterator over the entries of any buffered reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> ParsedEntries<'_, R> {
        ParsedEntries {
            parser: self,
            reader,
            buffer: Vec::new(),
            line_number: 0,
            stats: ParseStats::default(),
            finished: false,
        }
    }

    /// Parse a single line
    pub fn parse_line(&self, line: &str) -> Result<LogEntry, ParseFailure> {
        let line = line.trim();
        let caps = self
            .line_pattern
            .captures(line)
            .ok_or(ParseFailure::Malformed)?;

        let timestamp_str = format!(
            "{} {} {} {}:{}:{}",
            self.year, &caps["month"], &caps["day"], &caps["hour"], &caps["minute"], &caps["second"]
        );
        let timestamp = NaiveDateTime::parse_from_str(&timestamp_str, TIMESTAMP_FORMAT)
            .map_err(|_| ParseFailure::InvalidTimestamp(timestamp_str.clone()))?;

        let event = &caps["event"];
        let event_type = if event.contains(PASSWORD_MARKER) {
            EVENT_LOGIN
        } else {
            EVENT_OTHER
        };

        // event_type is one of two non-empty constants
        let mut entry = LogEntry::new(timestamp, event_type)
            .map_err(|_| ParseFailure::Malformed)?
            .with_success(event.contains(SUCCESS_MARKER))
            .with_details(event);

        if let Some(user) = self.extract_user(event) {
            entry = entry.with_user(user);
        }
        if let Some(address) = self.extract_address(event) {
            entry = entry.with_source_address(address);
        }

        Ok(entry)
    }

    fn extract_user<'e>(&self, event: &'e str) -> Option<&'e str> {
        self.user_pattern
            .captures(event)
            .and_then(|caps| caps.name("user"))
            .map(|m| m.as_str())
    }

    fn extract_address(&self, event: &str) -> Option<IpAddr> {
        self.address_pattern
            .captures_iter(event)
            .filter_map(|caps| caps.name("address"))
            .find_map(|m| m.as_str().trim_end_matches('.').parse::<IpAddr>().ok())
    }

    fn report(&self, line_number: usize, failure: ParseFailure, line: String) {
        self.sink.record(ParseDiagnostic {
            line_number,
            failure,
            line,
        });
    }
}

impl Default for AuthLogParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-pass iterator over parsed entries
///
/// Bad lines are reported to the parser's sink and skipped. A read error
/// from the source is reported and ends the iteration.
pub struct ParsedEntries<'a, R> {
    parser: &'a AuthLogParser,
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    stats: ParseStats,
    finished: bool,
}

impl<R> ParsedEntries<'_, R> {
    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for ParsedEntries<'_, R> {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        while !self.finished {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line_number += 1;

                    let text = match std::str::from_utf8(&self.buffer) {
                        Ok(text) => text,
                        Err(_) => {
                            self.stats.skipped += 1;
                            self.parser.report(
                                self.line_number,
                                ParseFailure::InvalidEncoding,
                                String::from_utf8_lossy(&self.buffer).trim().to_string(),
                            );
                            continue;
                        }
                    };

                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match self.parser.parse_line(line) {
                        Ok(entry) => {
                            self.stats.parsed += 1;
                            return Some(entry);
                        }
                        Err(failure) => {
                            self.stats.skipped += 1;
                            self.parser.report(self.line_number, failure, line.to_string());
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    self.parser.report(
                        self.line_number + 1,
                        ParseFailure::Read(e.to_string()),
                        String::new(),
                    );
                }
            }
        }
        None
    }
}
