//! Recency-ordered log extraction.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Writes the first line of the N most recently modified `.log` files.
///
/// Files are ordered newest first by modification time. Asking for more
/// files than exist is not an error; the run covers what is there. A log
/// file that cannot be read contributes an error line instead of
/// aborting the whole run.
pub struct RecentLogsOp;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "log_dir",
        ParamKind::Path,
        "Directory containing .log files",
    ),
    ParamSpec::required(
        "num_files",
        ParamKind::Integer,
        "How many of the most recent log files to cover",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the collected first lines are written to, one per line",
    ),
];

#[async_trait]
impl Operation for RecentLogsOp {
    fn name(&self) -> &str {
        "recent_logs"
    }

    fn description(&self) -> &str {
        "Write the first line of the N most recently modified .log files in a \
         directory to an output file, most recent first."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let log_dir = args.path("log_dir")?;
        let requested = args.integer("num_files")?;
        let output_file = args.path("output_file")?;

        let requested = match usize::try_from(requested) {
            Ok(n) => n,
            Err(_) => {
                return Ok(OperationResult::failure(format!(
                    "num_files must not be negative (got {requested})."
                )))
            }
        };

        let mut entries = match tokio::fs::read_dir(log_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot list {log_dir}: {e}"
                )))
            }
        };

        let mut logs: Vec<(PathBuf, SystemTime)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
                continue;
            }
            // An unreadable mtime sorts the file as oldest
            let modified = entry
                .metadata()
                .await
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            logs.push((path, modified));
        }

        logs.sort_by(|a, b| b.1.cmp(&a.1));
        logs.truncate(requested);

        let mut lines = String::new();
        for (path, _) in &logs {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => {
                    lines.push_str(content.lines().next().unwrap_or("").trim());
                }
                Err(_) => {
                    lines.push_str(&format!("Error reading file {}", path.display()));
                }
            }
            lines.push('\n');
        }

        tokio::fs::write(output_file, lines).await?;

        Ok(OperationResult::ok(format!(
            "Wrote first lines of {} recent log files from {log_dir} into {output_file}.",
            logs.len()
        ))
        .with_count(logs.len() as u64))
    }
}
