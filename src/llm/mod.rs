pub mod client;
pub mod openai;

pub use client::TaskSelector;
pub use openai::OpenAiClient;

/// A catalog entry as presented to the model.
///
/// `input_schema` is a JSON Schema object describing the operation's
/// parameters; providers translate it into their own tool wire format.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// The model's choice of operation, arguments still unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSelection {
    pub name: String,
    pub arguments: serde_json::Value,
}
