use std::path::PathBuf;
use structopt::StructOpt;

use petra::config::Config;
use petra::output::{OutputFormat, OutputHandler};
use petra::ScanPipeline;

/// PETRA - Post-Exploitation Threat Recognition & Analysis
#[derive(StructOpt, Debug)]
#[structopt(name = "petra", about = "Authentication log anomaly scanner")]
pub enum Cli {
    /// Scan an auth log for anomalies
    Scan {
        /// Path to auth log file
        #[structopt(short, long)]
        file: PathBuf,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config/default.toml")]
        config: PathBuf,
        /// Output format: console, json or jsonl
        #[structopt(long, default_value = "console")]
        format: OutputFormat,
        /// Write results to this file instead of stdout
        #[structopt(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config/default.toml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    if let Err(e) = run(Cli::from_args()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli {
        Cli::Scan {
            file,
            config,
            format,
            output,
        } => {
            log::info!("Scanning {:?} with config {:?}", file, config);
            let pipeline = ScanPipeline::from_config_file(&config)?;
            let anomalies = pipeline.scan(&file)?;

            let mut handler = OutputHandler::new(format, output)?;
            handler.write_report(&anomalies)?;
            handler.flush()?;

            if anomalies.iter().any(|a| a.is_critical()) {
                // Terminal bell plus a highlighted banner
                eprintln!("\x07\x1b[1;41m CRITICAL \x1b[0m critical anomalies detected, investigate now");
            }
        }
        Cli::Config { output } => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Config::default().to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
    }

    Ok(())
}
