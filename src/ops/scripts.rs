//! Subprocess-backed helpers: dataset generation and in-place formatting.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Formatter package, pinned so output stays reproducible.
const PRETTIER_PACKAGE: &str = "prettier@3.4.2";

/// Budget for one external process, install steps included.
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the dataset-generation script with an email seed.
///
/// `uv` is installed best-effort first; a failed install is ignored when
/// the tool is already present.
pub struct GenerateDataOp {
    data_root: PathBuf,
}

impl GenerateDataOp {
    pub fn new(data_root: PathBuf) -> Self {
        Self { data_root }
    }
}

const GENERATE_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "email",
    ParamKind::Text,
    "Email address the generation script is seeded with",
)];

#[async_trait]
impl Operation for GenerateDataOp {
    fn name(&self) -> &str {
        "generate_data"
    }

    fn description(&self) -> &str {
        "Install uv if required and run the datagen.py data-generation script \
         with an email address as its only argument."
    }

    fn params(&self) -> &[ParamSpec] {
        GENERATE_PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let email = args.text("email")?;

        let _ = run_command("pip", &["install", "uv"], SCRIPT_TIMEOUT).await;

        let root = self.data_root.display().to_string();
        let output = run_command(
            "uv",
            &["run", "datagen.py", email, "--root", root.as_str()],
            SCRIPT_TIMEOUT,
        )
        .await;

        Ok(command_result(output, "datagen.py", "Data generation complete."))
    }
}

/// Rewrites a file in place with Prettier.
pub struct FormatFileOp;

const FORMAT_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "filepath",
    ParamKind::Path,
    "File rewritten in place by the formatter",
)];

#[async_trait]
impl Operation for FormatFileOp {
    fn name(&self) -> &str {
        "format_file"
    }

    fn description(&self) -> &str {
        "Format a file in place using Prettier, updating it directly."
    }

    fn params(&self) -> &[ParamSpec] {
        FORMAT_PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let filepath = args.path("filepath")?;

        if !filepath.as_path().exists() {
            return Ok(OperationResult::failure(format!(
                "File {filepath} does not exist."
            )));
        }

        let target = filepath.to_string();
        let output = run_command(
            "npx",
            &[PRETTIER_PACKAGE, "--write", target.as_str()],
            SCRIPT_TIMEOUT,
        )
        .await;

        Ok(command_result(
            output,
            "prettier",
            &format!("Formatted {filepath}."),
        ))
    }
}

/// Runs a command to completion within `budget`.
async fn run_command(
    program: &str,
    args: &[&str],
    budget: Duration,
) -> anyhow::Result<Output> {
    debug!("Running `{program} {}`", args.join(" "));
    let mut command = Command::new(program);
    command.args(args);
    match tokio::time::timeout(budget, command.output()).await {
        Ok(result) => result.map_err(|e| anyhow::anyhow!("cannot run `{program}`: {e}")),
        Err(_) => anyhow::bail!(
            "`{program}` timed out after {}s",
            budget.as_secs()
        ),
    }
}

/// Folds a finished (or failed) command into an operation result.
///
/// Success prefers the command's own stdout as the message, falling back
/// to `fallback` when the command was quiet.
fn command_result(
    output: anyhow::Result<Output>,
    what: &str,
    fallback: &str,
) -> OperationResult {
    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim();
            if stdout.is_empty() {
                OperationResult::ok(fallback)
            } else {
                OperationResult::ok(stdout)
            }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            OperationResult::failure(format!(
                "{what} failed ({}): {}",
                output.status,
                stderr.trim()
            ))
        }
        Err(e) => OperationResult::failure(format!("{what} failed: {e}")),
    }
}
