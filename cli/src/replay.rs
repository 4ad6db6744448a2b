//! Production traffic replay.
//!
//! Loads `<datasets_dir>/<name>/<file>` for every dataset directory and sends one
//! row per dataset per tick to the monitoring server, cycling through each file.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use shared::config::DataFormat;
use shared::dataset::CsvTable;
use std::path::Path;
use std::time::Duration;

/// Rows of one dataset to replay.
#[derive(Debug)]
pub struct ReplaySource {
    /// Dataset name, taken from its directory.
    pub name: String,
    /// Parsed production file.
    pub table: CsvTable,
}

impl ReplaySource {
    /// Returns the row sent at `tick`, wrapping around the end of the file.
    #[must_use]
    pub fn row_at(&self, tick: usize) -> Option<Map<String, Value>> {
        if self.table.is_empty() {
            return None;
        }
        self.table.record_json(tick % self.table.len())
    }
}

/// Loads every dataset directory holding `file_name`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed, a file cannot be parsed,
/// or no dataset was found.
pub fn load_sources(
    datasets_dir: &Path,
    file_name: &str,
    format: &DataFormat,
) -> Result<Vec<ReplaySource>> {
    let entries = std::fs::read_dir(datasets_dir)
        .with_context(|| format!("Cannot find datasets in {}", datasets_dir.display()))?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path().join(file_name);
        if !path.is_file() {
            tracing::warn!(dataset = %name, path = %path.display(), "No production file, skipping");
            continue;
        }

        let table = CsvTable::read(&path, format)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        tracing::info!(dataset = %name, rows = table.len(), "Loaded production data");
        sources.push(ReplaySource { name, table });
    }

    if sources.is_empty() {
        bail!(
            "No dataset with a {file_name} file found in {}",
            datasets_dir.display()
        );
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// Number of ticks needed to send every row of the longest file once.
#[must_use]
pub fn tick_count(sources: &[ReplaySource], limit: Option<usize>) -> usize {
    let longest = sources.iter().map(|s| s.table.len()).max().unwrap_or(0);
    limit.map_or(longest, |limit| limit.min(longest))
}

/// Sends rows until every file has been replayed or `limit` ticks have passed.
///
/// Connection failures and error responses are logged and the replay continues.
///
/// # Errors
///
/// Returns an error only if the HTTP client cannot be built.
pub async fn run(
    url: &str,
    sources: &[ReplaySource],
    interval: Duration,
    limit: Option<usize>,
) -> Result<ReplayStats> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let base = url.trim_end_matches('/');
    let ticks = tick_count(sources, limit);
    let mut stats = ReplayStats::default();

    for tick in 0..ticks {
        for source in sources {
            let Some(row) = source.row_at(tick) else {
                continue;
            };
            let endpoint = format!("{base}/iterate/{}", source.name);
            tracing::info!(dataset = %source.name, tick, "Sending a data item");

            match client.post(&endpoint).json(&[row]).send().await {
                Ok(response) if response.status().is_success() => stats.sent += 1,
                Ok(response) => {
                    stats.failed += 1;
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    tracing::warn!(dataset = %source.name, %status, body = %text, "Server rejected the row");
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(dataset = %source.name, error = %e, "Cannot reach the monitoring server");
                }
            }
        }

        if tick + 1 < ticks {
            tracing::info!(seconds = interval.as_secs_f64(), "Waiting till the next send");
            tokio::time::sleep(interval).await;
        }
    }

    Ok(stats)
}

/// Counters of a finished replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Rows acknowledged by the server.
    pub sent: usize,
    /// Rows rejected or not delivered.
    pub failed: usize,
}
