use crate::models::Anomaly;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Output handler for scan results
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "console" => Ok(OutputFormat::Console),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

const DESCRIPTION_WIDTH: usize = 72;

impl OutputHandler {
    /// Create a new output handler; without a file path output goes to stdout
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let writer: Option<Box<dyn Write + Send>> = match file_path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            None => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write the findings of one scan
    pub fn write_report(&mut self, anomalies: &[Anomaly]) -> Result<(), Box<dyn std::error::Error>> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(anomalies)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Jsonl => {
                let mut lines = String::new();
                for anomaly in anomalies {
                    lines.push_str(&serde_json::to_string(anomaly)?);
                    lines.push('\n');
                }
                self.write_output(&lines)?;
            }
            OutputFormat::Console => {
                let output = render_table(anomalies);
                self.write_output(&output)?;
            }
        }
        Ok(())
    }

    fn write_output(&mut self, data: &str) -> Result<(), Box<dyn std::error::Error>> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                std::io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Console table: level, score, type, source address, description
pub fn render_table(anomalies: &[Anomaly]) -> String {
    if anomalies.is_empty() {
        return "No anomalies detected.\n".to_string();
    }

    let mut out = format!("ANOMALIES DETECTED: {}\n\n", anomalies.len());
    out.push_str(&format!(
        "{:<9} {:>5}  {:<15} {:<39} {}\n",
        "LEVEL", "SCORE", "TYPE", "SOURCE", "DESCRIPTION"
    ));

    for anomaly in anomalies {
        let source = anomaly
            .primary_source()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<9} {:>5.2}  {:<15} {:<39} {}\n",
            anomaly.level().as_str(),
            anomaly.score(),
            anomaly.kind(),
            source,
            truncate(anomaly.description(), DESCRIPTION_WIDTH)
        ));
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
