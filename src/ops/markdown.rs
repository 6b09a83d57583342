//! Markdown title indexing over a directory tree.

use std::collections::BTreeMap;

use async_trait::async_trait;
use walkdir::WalkDir;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Builds an index mapping each Markdown file to its first H1 title.
///
/// The input directory is walked recursively; keys are paths relative to
/// it, so the index stays valid when the tree moves. Files without an H1
/// are omitted.
pub struct IndexMarkdownOp;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_dir",
        ParamKind::Path,
        "Directory scanned recursively for .md files",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the JSON index is written to",
    ),
];

#[async_trait]
impl Operation for IndexMarkdownOp {
    fn name(&self) -> &str {
        "index_markdown"
    }

    fn description(&self) -> &str {
        "Scan a directory tree for Markdown files and write a JSON index mapping \
         each file's relative path to its first H1 heading."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_dir = args.path("input_dir")?;
        let output_file = args.path("output_file")?;

        if !input_dir.as_path().is_dir() {
            return Ok(OperationResult::failure(format!(
                "{input_dir} is not a directory."
            )));
        }

        let mut index: BTreeMap<String, String> = BTreeMap::new();
        for entry in WalkDir::new(input_dir.as_path())
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let content = tokio::fs::read_to_string(path).await?;
            if let Some(title) = first_h1(&content) {
                let relative = path.strip_prefix(input_dir.as_path()).unwrap_or(path);
                index.insert(
                    relative.to_string_lossy().into_owned(),
                    title.to_string(),
                );
            }
        }

        let json = serde_json::to_string_pretty(&index)?;
        tokio::fs::write(output_file, json).await?;

        Ok(OperationResult::ok(format!(
            "Indexed {} Markdown titles from {input_dir} into {output_file}.",
            index.len()
        ))
        .with_count(index.len() as u64))
    }
}

/// First line of `content` that is an H1, its text trimmed.
///
/// Lines are trimmed before matching, so indented headings count;
/// deeper headings (`##`, `###`) do not.
fn first_h1(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# ").filter(|title| !title.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::sandbox::Sandbox;

    fn run_args(dir: &Path) -> TaskArgs {
        let sandbox = Sandbox::new(dir);
        let mut paths = BTreeMap::new();
        paths.insert(
            "input_dir".to_string(),
            sandbox
                .resolve(dir.join("docs").to_str().unwrap())
                .unwrap(),
        );
        paths.insert(
            "output_file".to_string(),
            sandbox
                .resolve(dir.join("index.json").to_str().unwrap())
                .unwrap(),
        );
        TaskArgs::new(serde_json::Map::new(), paths)
    }

    fn read_index(dir: &Path) -> BTreeMap<String, String> {
        let content = std::fs::read_to_string(dir.join("index.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    // ── first_h1 tests ──────────────────────────────────

    #[test]
    fn test_first_h1_basic() {
        assert_eq!(first_h1("# Title\nbody\n"), Some("Title"));
    }

    #[test]
    fn test_first_h1_not_on_first_line() {
        assert_eq!(first_h1("preamble\n\n# Actual Title\n"), Some("Actual Title"));
    }

    #[test]
    fn test_first_h1_wins_over_later_ones() {
        assert_eq!(first_h1("# First\n# Second\n"), Some("First"));
    }

    #[test]
    fn test_first_h1_ignores_deeper_headings() {
        assert_eq!(first_h1("## Section\n### Sub\n"), None);
    }

    #[test]
    fn test_first_h1_trims_indentation_and_trailing_space() {
        assert_eq!(first_h1("   # Padded Title   \n"), Some("Padded Title"));
    }

    #[test]
    fn test_first_h1_requires_text() {
        assert_eq!(first_h1("#\n# \nbody\n"), None);
    }

    // ── execute tests ───────────────────────────────────

    #[tokio::test]
    async fn test_indexes_nested_tree_with_relative_keys() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("guide")).unwrap();
        std::fs::write(docs.join("intro.md"), "# Introduction\ntext\n").unwrap();
        std::fs::write(
            docs.join("guide").join("setup.md"),
            "prose first\n# Setup Guide\n",
        )
        .unwrap();

        let op = IndexMarkdownOp;
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert!(result.success);
        assert_eq!(result.count, Some(2));
        let index = read_index(dir.path());
        assert_eq!(index.get("intro.md").map(String::as_str), Some("Introduction"));
        assert_eq!(
            index.get("guide/setup.md").map(String::as_str),
            Some("Setup Guide")
        );
    }

    #[tokio::test]
    async fn test_files_without_h1_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("titled.md"), "# Has Title\n").unwrap();
        std::fs::write(docs.join("untitled.md"), "## only subsections\n").unwrap();

        let op = IndexMarkdownOp;
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert_eq!(result.count, Some(1));
        let index = read_index(dir.path());
        assert!(index.contains_key("titled.md"));
        assert!(!index.contains_key("untitled.md"));
    }

    #[tokio::test]
    async fn test_non_markdown_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("readme.txt"), "# Not Markdown\n").unwrap();

        let op = IndexMarkdownOp;
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert_eq!(result.count, Some(0));
        assert_eq!(read_index(dir.path()).len(), 0);
    }

    #[tokio::test]
    async fn test_empty_tree_writes_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        let op = IndexMarkdownOp;
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert!(result.success);
        let content = std::fs::read_to_string(dir.path().join("index.json")).unwrap();
        assert_eq!(content, "{}");
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();

        let op = IndexMarkdownOp;
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("not a directory"));
    }

    #[tokio::test]
    async fn test_index_keys_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("zebra.md"), "# Z\n").unwrap();
        std::fs::write(docs.join("alpha.md"), "# A\n").unwrap();

        let op = IndexMarkdownOp;
        op.execute(&run_args(dir.path())).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("index.json")).unwrap();
        let alpha_pos = content.find("alpha.md").unwrap();
        let zebra_pos = content.find("zebra.md").unwrap();
        assert!(alpha_pos < zebra_pos);
    }
}
