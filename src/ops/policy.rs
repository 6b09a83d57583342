//! Standing-refusal catalog entry for deletion requests.

use async_trait::async_trait;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Message returned for every deletion request, whatever the target.
const REFUSAL: &str = "Deletion of data is not permitted anywhere on the file system";

/// Catalog entry that deletion instructions select, and that never runs.
///
/// The entry exists so the model has something concrete to pick when an
/// instruction asks for a file to be removed; dispatch then rejects the
/// selection at the policy gate, before confinement or validation see
/// the arguments.
pub struct NeverDeleteOp;

const PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "file",
    ParamKind::Text,
    "File requested for deletion",
)];

#[async_trait]
impl Operation for NeverDeleteOp {
    fn name(&self) -> &str {
        "never_delete"
    }

    fn description(&self) -> &str {
        "Delete or remove a file. Select this whenever the instruction asks \
         for a file to be deleted, removed or erased."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn standing_refusal(&self) -> Option<&str> {
        Some(REFUSAL)
    }

    /// Unreachable through dispatch; the refusal gate fires first.
    async fn execute(&self, _args: &TaskArgs) -> anyhow::Result<OperationResult> {
        Ok(OperationResult::failure(REFUSAL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_declares_standing_refusal() {
        let op = NeverDeleteOp;
        assert_eq!(op.standing_refusal(), Some(REFUSAL));
    }

    #[test]
    fn test_contract_advertises_a_file_argument() {
        let op = NeverDeleteOp;
        assert_eq!(op.name(), "never_delete");
        assert_eq!(op.params().len(), 1);
        assert_eq!(op.params()[0].name, "file");
        assert_eq!(op.params()[0].kind, ParamKind::Text);
        assert!(op.params()[0].required);
    }

    #[tokio::test]
    async fn test_direct_execution_still_refuses() {
        let op = NeverDeleteOp;
        let args = TaskArgs::new(serde_json::Map::new(), BTreeMap::new());
        let result = op.execute(&args).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, REFUSAL);
    }
}
