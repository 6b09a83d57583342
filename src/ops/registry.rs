//! Operation registry: the fixed catalog shown to the selection step.
//!
//! Registration order is wire order: the model sees the same tools array
//! on every run, so selection behavior stays reproducible.

use std::sync::Arc;

use crate::config::Config;
use crate::llm::{OpenAiClient, ToolDefinition};

use super::{comments, contacts, dates, extract, logs, markdown, policy, scripts, tickets};
use super::{parameters_schema, Operation};

pub struct OperationRegistry {
    ops: Vec<Box<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Builds the standard catalog.
    ///
    /// LLM-backed operations share one client; `generate_data` gets the
    /// data root so the generation script writes inside it.
    pub fn standard(config: &Config, llm: Arc<OpenAiClient>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(scripts::GenerateDataOp::new(
            config.engine.data_root.clone(),
        )));
        registry.register(Box::new(scripts::FormatFileOp));
        registry.register(Box::new(dates::CountWeekdaysOp));
        registry.register(Box::new(contacts::SortContactsOp));
        registry.register(Box::new(logs::RecentLogsOp));
        registry.register(Box::new(markdown::IndexMarkdownOp));
        registry.register(Box::new(extract::ExtractSenderOp::new(llm.clone())));
        registry.register(Box::new(extract::ExtractCardNumberOp::new(llm.clone())));
        registry.register(Box::new(comments::SimilarCommentsOp::new(llm)));
        registry.register(Box::new(tickets::TicketSalesOp));
        registry.register(Box::new(policy::NeverDeleteOp));
        registry
    }

    pub fn register(&mut self, op: Box<dyn Operation>) {
        self.ops.push(op);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Operation> {
        self.ops
            .iter()
            .find(|op| op.name() == name)
            .map(|op| op.as_ref())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Tool definitions in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.ops
            .iter()
            .map(|op| ToolDefinition {
                name: op.name().to_string(),
                description: op.description().to_string(),
                input_schema: parameters_schema(op.params()),
            })
            .collect()
    }
}
