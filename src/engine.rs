//! Task dispatch and execution engine.
//!
//! One instruction in, one `OperationResult` out. The pipeline is fixed:
//! the selector maps the instruction to at most one catalog entry, the
//! standing-policy gate rejects refusal entries outright, every
//! path-valued argument is confined to the data root, the remaining
//! arguments are checked against the operation's declared contract, and
//! only then does the handler run. A handler fault never escapes as an
//! error; it is folded into a failed result at this boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{OpenAiClient, TaskSelector, ToolDefinition};
use crate::ops::{OperationRegistry, OperationResult, ParamKind, ParamSpec, TaskArgs};
use crate::sandbox::{Sandbox, SandboxError, SandboxedPath};

/// Request-level failures: everything that can go wrong strictly before
/// a handler runs, plus the file-read interface's own conditions.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("no operation matched the instruction")]
    NoSelection,
    #[error("model selected unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("task selection failed: {0}")]
    Upstream(anyhow::Error),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("invalid arguments for `{operation}`: {reason}")]
    InvalidArguments { operation: String, reason: String },
    #[error("{0}")]
    PolicyRejection(String),
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct Engine {
    selector: Arc<dyn TaskSelector>,
    registry: OperationRegistry,
    sandbox: Sandbox,
}

impl Engine {
    /// Builds the production engine: OpenAI-compatible selector, standard
    /// catalog, sandbox rooted at the configured data root.
    pub fn new(config: &Config) -> Self {
        let llm = Arc::new(OpenAiClient::new(config.llm.clone()));
        let registry = OperationRegistry::standard(config, llm.clone());
        let sandbox = Sandbox::new(config.engine.data_root.clone());
        Self::with_parts(llm, registry, sandbox)
    }

    /// Assembles an engine from explicit parts. Tests use this to swap in
    /// a deterministic selector.
    pub fn with_parts(
        selector: Arc<dyn TaskSelector>,
        registry: OperationRegistry,
        sandbox: Sandbox,
    ) -> Self {
        info!(
            "Engine ready: {} operations, selector {}",
            registry.len(),
            selector.description()
        );
        Self {
            selector,
            registry,
            sandbox,
        }
    }

    /// Tool definitions in catalog order, for status output.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.registry.tool_definitions()
    }

    /// Runs one free-text instruction through the full pipeline.
    ///
    /// `Err` covers everything that fails before the handler runs; once a
    /// handler has been dispatched the outcome is always `Ok`, with
    /// handler faults folded into a failed [`OperationResult`].
    pub async fn run_task(&self, instruction: &str) -> Result<OperationResult, TaskError> {
        let selection = self
            .selector
            .select(instruction, &self.registry.tool_definitions())
            .await
            .map_err(TaskError::Upstream)?
            .ok_or(TaskError::NoSelection)?;

        debug!(
            "Selected operation `{}` with arguments {}",
            selection.name, selection.arguments
        );

        let operation = self
            .registry
            .get(&selection.name)
            .ok_or_else(|| TaskError::UnknownOperation(selection.name.clone()))?;

        // Policy first: a refusal entry rejects before its arguments are
        // even looked at.
        if let Some(message) = operation.standing_refusal() {
            warn!("Refusing `{}` by standing policy", operation.name());
            return Err(TaskError::PolicyRejection(message.to_string()));
        }

        let values = match selection.arguments {
            Value::Object(map) => map,
            other => {
                return Err(TaskError::InvalidArguments {
                    operation: selection.name,
                    reason: format!("arguments must be a JSON object, got {other}"),
                })
            }
        };

        // Confinement runs strictly before validation: an escaping path
        // is a sandbox violation even when other arguments are missing.
        let paths = self.confine_paths(operation.params(), &values)?;
        validate_arguments(operation.name(), operation.params(), &values)?;
        let args = TaskArgs::new(values, paths);

        match operation.execute(&args).await {
            Ok(result) => {
                info!(
                    "Operation `{}` finished: success={}",
                    operation.name(),
                    result.success
                );
                Ok(result)
            }
            Err(fault) => {
                warn!("Operation `{}` faulted: {fault:#}", operation.name());
                Ok(OperationResult::failure(format!("{fault:#}")))
            }
        }
    }

    /// Returns the content of a file under the data root.
    pub async fn read_file(&self, raw_path: &str) -> Result<String, TaskError> {
        let path = self.sandbox.resolve(raw_path)?;
        if !path.as_path().exists() {
            return Err(TaskError::NotFound(path.to_string()));
        }
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TaskError::Io {
                path: path.to_string(),
                source,
            })
    }

    /// Resolves every present path-valued argument against the sandbox.
    ///
    /// Absent or non-string values are left for the validator to report;
    /// confinement only answers whether a supplied path stays inside the
    /// root.
    fn confine_paths(
        &self,
        params: &[ParamSpec],
        values: &Map<String, Value>,
    ) -> Result<BTreeMap<String, SandboxedPath>, TaskError> {
        let mut paths = BTreeMap::new();
        for spec in params {
            if spec.kind != ParamKind::Path {
                continue;
            }
            if let Some(raw) = values.get(spec.name).and_then(Value::as_str) {
                let confined = self.sandbox.resolve(raw)?;
                debug!("Confined `{}` to {confined}", spec.name);
                paths.insert(spec.name.to_string(), confined);
            }
        }
        Ok(paths)
    }
}

/// Checks presence and JSON shape of every declared parameter.
fn validate_arguments(
    operation: &str,
    params: &[ParamSpec],
    values: &Map<String, Value>,
) -> Result<(), TaskError> {
    for spec in params {
        let value = match values.get(spec.name) {
            Some(value) => value,
            None if spec.required => {
                return Err(TaskError::InvalidArguments {
                    operation: operation.to_string(),
                    reason: format!("missing required parameter `{}`", spec.name),
                })
            }
            None => continue,
        };
        let well_formed = match spec.kind {
            ParamKind::Text | ParamKind::Path => value.is_string(),
            // Floats are not integers, even round ones; i64 is the
            // widest integer handlers accept
            ParamKind::Integer => value.is_i64(),
            ParamKind::TextArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };
        if !well_formed {
            return Err(TaskError::InvalidArguments {
                operation: operation.to_string(),
                reason: format!("parameter `{}` has the wrong type", spec.name),
            });
        }
    }
    Ok(())
}
