pub mod auth_log;
pub mod diagnostics;

pub use auth_log::{AuthLogParser, ParseStats, ParsedEntries};
pub use diagnostics::{DiagnosticSink, LogSink, MemorySink, ParseDiagnostic, ParseFailure};
