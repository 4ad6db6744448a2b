//! Driftwatch CLI
//!
//! Command-line interface for the Driftwatch drift monitoring service.
//!
//! # Usage
//!
//! ```bash
//! driftwatch --help
//! driftwatch health
//! driftwatch metrics
//! driftwatch check-config config.yaml
//! driftwatch send --datasets-dir datasets --timeout 2
//! ```

#![deny(unsafe_code)]

mod replay;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::config::{DataFormat, MonitoringConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Driftwatch CLI - drift monitoring command-line interface
#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Monitoring server URL
    #[arg(
        short,
        long,
        env = "DRIFTWATCH_URL",
        default_value = "http://127.0.0.1:8085"
    )]
    url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check monitoring server health
    Health,

    /// Print the Prometheus metrics exposed by the server
    Metrics,

    /// Load and validate a monitoring configuration file
    CheckConfig {
        /// Path of the YAML file
        #[arg(default_value = "config.yaml")]
        path: PathBuf,
    },

    /// Replay production rows of every dataset to the server
    Send {
        /// Directory holding one sub-directory per dataset
        #[arg(short, long, default_value = "datasets")]
        datasets_dir: PathBuf,

        /// File read inside each dataset directory
        #[arg(short, long, default_value = "production.csv")]
        file: String,

        /// Seconds to wait between two sends
        #[arg(short, long, default_value_t = 2.0)]
        timeout: f64,

        /// Maximum number of rows sent per dataset
        #[arg(short, long)]
        limit: Option<usize>,

        /// Field separator of the production files
        #[arg(long, default_value_t = ',')]
        separator: char,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Some(Commands::Health) => {
            println!("Checking health of Driftwatch at {base}...");
            let health: serde_json::Value = reqwest::get(format!("{base}/health"))
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Some(Commands::Metrics) => {
            let text = reqwest::get(format!("{base}/metrics"))
                .await?
                .error_for_status()?
                .text()
                .await?;
            print!("{text}");
        }
        Some(Commands::CheckConfig { path }) => {
            let config = MonitoringConfig::from_file(&path)
                .with_context(|| format!("Invalid configuration {}", path.display()))?;
            println!("{}", config_summary(&config));
        }
        Some(Commands::Send {
            datasets_dir,
            file,
            timeout,
            limit,
            separator,
        }) => {
            let interval = send_interval(timeout)?;
            let format = DataFormat {
                separator,
                ..DataFormat::default()
            };
            let sources = replay::load_sources(&datasets_dir, &file, &format)?;
            tracing::info!(
                datasets = sources.len(),
                timeout,
                "Sending production data to {base}"
            );
            let stats =
                replay::run(base, &sources, interval, limit).await?;
            println!("Sent {} rows, {} failed", stats.sent, stats.failed);
        }
        None => {
            println!("Driftwatch CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

/// Converts the `--timeout` seconds into the pause between two sends.
fn send_interval(timeout: f64) -> Result<Duration> {
    if timeout < 0.0 {
        bail!("timeout must be a non-negative number of seconds");
    }
    Duration::try_from_secs_f64(timeout)
        .map_err(|e| anyhow::anyhow!("timeout {timeout} is not a valid number of seconds: {e}"))
}

fn config_summary(config: &MonitoringConfig) -> String {
    let mut lines = vec![
        format!("datasets_path: {}", config.service.datasets_path),
        format!(
            "window_size: {}, calculation_period_sec: {}",
            config.service.window_size, config.service.calculation_period_sec
        ),
    ];
    for (name, dataset) in &config.datasets {
        let monitors: Vec<&str> = dataset.monitors.iter().map(|m| m.as_str()).collect();
        lines.push(format!(
            "{name}: {} numerical, {} categorical features, monitors [{}]",
            dataset.column_mapping.numerical_features.len(),
            dataset.column_mapping.categorical_features.len(),
            monitors.join(", ")
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["driftwatch"]);
        assert!(cli.is_ok());
        assert_eq!(cli.unwrap().url, "http://127.0.0.1:8085");
    }

    #[test]
    fn test_cli_health_command() {
        let cli = Cli::try_parse_from(["driftwatch", "health"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn test_cli_send_defaults() {
        let cli = Cli::try_parse_from(["driftwatch", "send"]).unwrap();
        match cli.command {
            Some(Commands::Send {
                datasets_dir,
                file,
                timeout,
                limit,
                separator,
            }) => {
                assert_eq!(datasets_dir, PathBuf::from("datasets"));
                assert_eq!(file, "production.csv");
                assert!((timeout - 2.0).abs() < f64::EPSILON);
                assert_eq!(limit, None);
                assert_eq!(separator, ',');
            }
            _ => panic!("expected send command"),
        }
    }

    #[test]
    fn test_cli_send_options() {
        let cli = Cli::try_parse_from([
            "driftwatch",
            "--url",
            "http://monitor:8085",
            "send",
            "--timeout",
            "0.5",
            "--limit",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.url, "http://monitor:8085");
        assert!(matches!(
            cli.command,
            Some(Commands::Send { limit: Some(10), .. })
        ));
    }

    #[test]
    fn test_send_interval() {
        assert_eq!(send_interval(0.5).unwrap(), Duration::from_millis(500));
        assert_eq!(send_interval(0.0).unwrap(), Duration::ZERO);
        assert!(send_interval(-1.0).is_err());
        assert!(send_interval(1e300).is_err());
        assert!(send_interval(f64::INFINITY).is_err());
        assert!(send_interval(f64::NAN).is_err());
    }

    #[test]
    fn test_config_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r"
service:
  datasets_path: datasets
  use_reference: true
  moving_reference: false
  window_size: 30
  calculation_period_sec: 10
datasets:
  houses:
    column_mapping:
      numerical_features: [bedrooms, sqft_living]
      categorical_features: [condition]
    monitors: [data_drift]
",
        )
        .unwrap();

        let config = MonitoringConfig::from_file(&path).unwrap();
        let summary = config_summary(&config);

        assert!(summary.contains("window_size: 30"));
        assert!(summary.contains("houses: 2 numerical, 1 categorical features, monitors [data_drift]"));
    }
}
