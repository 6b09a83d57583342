pub mod registry;

pub mod comments;
pub mod contacts;
pub mod dates;
pub mod extract;
pub mod logs;
pub mod markdown;
pub mod policy;
pub mod scripts;
pub mod tickets;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::sandbox::SandboxedPath;

pub use registry::OperationRegistry;

/// Parameter shapes an operation can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free text.
    Text,
    /// JSON integer (floats are rejected).
    Integer,
    /// Array of strings.
    TextArray,
    /// Filesystem path. Advertised to the model as a plain string, but
    /// confined to the data root before the handler runs.
    Path,
}

/// One entry in an operation's parameter contract.
///
/// Declared once per operation and consumed three times: schema
/// generation for the model, path confinement, and argument validation.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }
}

/// Builds the JSON Schema object advertised to the model for `params`.
pub fn parameters_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for spec in params {
        let mut property = match spec.kind {
            ParamKind::Text | ParamKind::Path => json!({"type": "string"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::TextArray => json!({"type": "array", "items": {"type": "string"}}),
        };
        property["description"] = json!(spec.description);
        properties.insert(spec.name.to_string(), property);
        if spec.required {
            required.push(spec.name);
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Uniform outcome record produced by every dispatch.
///
/// `success: false` covers curated failures (missing input file, bad
/// data); unexpected handler faults are normalized into the same shape
/// at the dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    /// Item count, for operations that tally something
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Winning pair, for the similarity operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_indices: Option<(usize, usize)>,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            count: None,
            matched_indices: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            count: None,
            matched_indices: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_indices(mut self, first: usize, second: usize) -> Self {
        self.matched_indices = Some((first, second));
        self
    }
}

/// Validated arguments handed to a handler.
///
/// Path parameters are pre-resolved into [`SandboxedPath`]s; everything
/// else is accessed by the kind the operation declared. Accessor errors
/// mean the validator and a handler disagree about the contract, which
/// the dispatch boundary reports as a failed result.
pub struct TaskArgs {
    values: Map<String, Value>,
    paths: BTreeMap<String, SandboxedPath>,
}

impl TaskArgs {
    pub(crate) fn new(values: Map<String, Value>, paths: BTreeMap<String, SandboxedPath>) -> Self {
        Self { values, paths }
    }

    pub fn path(&self, name: &str) -> anyhow::Result<&SandboxedPath> {
        self.paths
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {name}"))
    }

    pub fn text(&self, name: &str) -> anyhow::Result<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {name}"))
    }

    pub fn integer(&self, name: &str) -> anyhow::Result<i64> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {name}"))
    }

    pub fn text_array(&self, name: &str) -> anyhow::Result<Vec<String>> {
        let items = self
            .values
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {name}"))?;
        Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}

/// An operation the model can select via tool calling.
///
/// All catalog entries implement this trait. The engine calls `execute()`
/// only after the standing-refusal gate, path confinement, and argument
/// validation have all passed.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Unique identifier used in the tools array.
    /// Must be lowercase alphanumeric + underscores (e.g. "sort_contacts").
    fn name(&self) -> &str;

    /// Human-readable description shown to the model so it knows
    /// when to select this operation.
    fn description(&self) -> &str;

    /// Parameter contract; drives schema generation, confinement and
    /// validation.
    fn params(&self) -> &[ParamSpec];

    /// Standing refusal message for entries that must never run.
    ///
    /// `Some` short-circuits dispatch before confinement and validation,
    /// so not even well-formed arguments reach `execute()`.
    fn standing_refusal(&self) -> Option<&str> {
        None
    }

    /// Executes over validated, confined arguments.
    ///
    /// `Ok` carries the outcome, curated failures included. `Err` is for
    /// unexpected faults only and is normalized at the dispatch boundary.
    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult>;
}
