//! `TaskSelector` trait, the seam between the engine and the model backend.
//!
//! The engine asks a selector to map a free-text instruction to at most
//! one catalog entry. Keeping this behind a trait lets the dispatch
//! pipeline run against a deterministic selector in tests while
//! production wires in an OpenAI-compatible backend.

use anyhow::Result;
use async_trait::async_trait;

use super::{ToolDefinition, ToolSelection};

#[async_trait]
pub trait TaskSelector: Send + Sync {
    /// Asks the model to pick at most one operation for `instruction`.
    ///
    /// `Ok(None)` means the model declined to select any tool. Transport
    /// failures and malformed responses are `Err`; the caller decides how
    /// to surface them.
    async fn select(
        &self,
        instruction: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<ToolSelection>>;

    /// Human-readable description of the provider and model.
    ///
    /// Used in status output, e.g. `"openai-compatible (gpt-4o-mini)"`.
    fn description(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time verification that `TaskSelector` is object-safe.
    #[test]
    fn test_task_selector_is_object_safe() {
        fn _assert_object_safe(_: &dyn TaskSelector) {}
    }
}
