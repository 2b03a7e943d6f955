use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use petra::input::ParseFailure;
use petra::{AnomalyLevel, MemorySink, ScanError, ScanPipeline};
use tempfile::{NamedTempFile, TempDir};

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn failed_line(ip: &str, second: u32) -> String {
    format!(
        "Nov 12 17:39:{:02} server sshd[1234]: Failed password for admin from {} port 22 ssh2\n",
        second % 60,
        ip
    )
}

fn pipeline_with_threshold(dir: &TempDir, threshold: usize) -> ScanPipeline {
    let config = write_file(
        dir,
        "config.toml",
        &format!("[thresholds]\nlogin_fails = {}\n", threshold),
    );
    ScanPipeline::from_config_file(&config).unwrap().with_year(2025)
}

#[test]
fn test_brute_force_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let log: String = (0..6).map(|i| failed_line("192.168.1.1", i)).collect();
    let log_path = write_file(&dir, "auth.log", &log);

    let anomalies = pipeline_with_threshold(&dir, 5).scan(&log_path).unwrap();

    assert_eq!(anomalies.len(), 1);
    let anomaly = &anomalies[0];
    assert_eq!(anomaly.kind(), "brute_force");
    assert_eq!(anomaly.level(), AnomalyLevel::High);
    assert_eq!(anomaly.score(), 0.06);
    assert_eq!(anomaly.evidence().len(), 6);
    assert_eq!(anomaly.evidence()[0].user(), Some("admin"));
}

#[test]
fn test_below_threshold_and_second_source() {
    let dir = tempfile::tempdir().unwrap();
    let mut log: String = (0..6).map(|i| failed_line("1.1.1.1", i)).collect();
    log.extend((0..3).map(|i| failed_line("2.2.2.2", i)));
    let log_path = write_file(&dir, "auth.log", &log);

    let anomalies = pipeline_with_threshold(&dir, 5).scan(&log_path).unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].primary_source().unwrap().to_string(), "1.1.1.1");
}

#[test]
fn test_missing_config_fails_before_parsing() {
    let result = ScanPipeline::from_config_file(Path::new("does/not/exist.toml"));
    match result {
        Err(ScanError::NotFound(path)) => assert!(path.ends_with("exist.toml")),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_undecodable_config() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[thresholds]\nlogin_fails = \"many\"").unwrap();

    let result = ScanPipeline::from_config_file(config.path());
    assert!(matches!(result, Err(ScanError::Configuration { .. })));
}

#[test]
fn test_unparseable_file_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_file(
        &dir,
        "garbage.log",
        "not a log line\nanother one\nFeb 31 10:00:00 host sshd[1]: Failed password for a from 1.1.1.1\n",
    );

    let sink = Arc::new(MemorySink::new());
    let pipeline = pipeline_with_threshold(&dir, 0).with_diagnostics(sink.clone());
    let anomalies = pipeline.scan(&log_path).unwrap();

    assert!(anomalies.is_empty());
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 3);
    assert!(matches!(diagnostics[2].failure, ParseFailure::InvalidTimestamp(_)));
}

#[test]
fn test_rule_findings_come_before_statistical() {
    let dir = tempfile::tempdir().unwrap();

    let mut log = String::new();
    for i in 0..40u32 {
        log.push_str(&format!(
            "Nov 12 {:02}:{:02}:00 server sshd[{}]: Accepted password for staff{} from 10.0.0.{} port 22 ssh2\n",
            9 + i % 8,
            (i * 11) % 60,
            100 + i,
            i % 4,
            i % 6 + 1
        ));
    }
    for i in 0..55 {
        log.push_str(&failed_line("203.0.113.9", i));
    }
    log.push_str("Nov 12 03:14:00 server sshd[9]: Failed password for root from 198.51.100.7 port 22 ssh2\n");
    let log_path = write_file(&dir, "auth.log", &log);

    let anomalies = pipeline_with_threshold(&dir, 10).scan(&log_path).unwrap();

    assert!(!anomalies.is_empty());
    assert_eq!(anomalies[0].kind(), "brute_force");
    assert_eq!(anomalies[0].level(), AnomalyLevel::Critical);
    assert_eq!(anomalies[0].evidence().len(), 55);
    assert!(anomalies[1..].iter().all(|a| a.kind() == "unusual_timing"));
    assert!(anomalies.iter().any(|a| a.is_critical()));
}

#[test]
fn test_scan_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let mut log: String = (0..12).map(|i| failed_line("192.168.1.1", i)).collect();
    log.push_str("Nov 12 02:00:00 server sshd[7]: Accepted password for ops from 10.1.1.1 port 22 ssh2\n");
    let log_path = write_file(&dir, "auth.log", &log);

    let pipeline = pipeline_with_threshold(&dir, 5);
    let first = pipeline.scan(&log_path).unwrap();
    let second = pipeline.scan(&log_path).unwrap();
    assert_eq!(first, second);
}
