//! Embedding-based similar-pair detection over comment files.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::OpenAiClient;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Comments are embedded in fixed-size batches, sequentially and in
/// input order, so vector N always belongs to comment N.
const BATCH_SIZE: usize = 20;

/// Finds the two most semantically similar comments in a file.
///
/// One comment per line; the winning pair is written to the output file
/// in input order, and its indices are reported in the result.
pub struct SimilarCommentsOp {
    llm: Arc<OpenAiClient>,
}

impl SimilarCommentsOp {
    pub fn new(llm: Arc<OpenAiClient>) -> Self {
        Self { llm }
    }
}

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_file",
        ParamKind::Path,
        "File containing one comment per line",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the two most similar comments are written to, one per line",
    ),
];

#[async_trait]
impl Operation for SimilarCommentsOp {
    fn name(&self) -> &str {
        "similar_comments"
    }

    fn description(&self) -> &str {
        "Find the two most similar comments in a file using embeddings and write \
         that pair to an output file, one comment per line."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_file = args.path("input_file")?;
        let output_file = args.path("output_file")?;

        let content = match tokio::fs::read_to_string(input_file).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot read {input_file}: {e}"
                )))
            }
        };

        let comments: Vec<&str> = content.lines().collect();
        if comments.len() < 2 {
            return Ok(OperationResult::failure(format!(
                "{input_file} holds {} comment(s); need at least two to compare.",
                comments.len()
            )));
        }

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(comments.len());
        for batch in comments.chunks(BATCH_SIZE) {
            let inputs: Vec<String> = batch.iter().map(|line| line.to_string()).collect();
            let mut vectors = self.llm.embed(&inputs).await?;
            embeddings.append(&mut vectors);
        }

        let (first, second) = match most_similar_pair(&embeddings) {
            Some(pair) => pair,
            None => {
                return Ok(OperationResult::failure(
                    "Could not rank any comment pair.",
                ))
            }
        };

        let pair = format!("{}\n{}\n", comments[first], comments[second]);
        tokio::fs::write(output_file, pair).await?;

        Ok(OperationResult::ok(format!(
            "Most similar comments ({first}, {second}) written to {output_file}."
        ))
        .with_indices(first, second))
    }
}

/// Highest-similarity pair over all i < j.
///
/// Scanning the upper triangle in row-major order and keeping strictly
/// better scores gives the same winner as an argmax over the full
/// matrix with the diagonal forced to the minimum: the pair with the
/// smallest indices wins ties, and a comment is never paired with
/// itself.
fn most_similar_pair(embeddings: &[Vec<f32>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f32)> = None;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            let similarity = cosine_similarity(&embeddings[i], &embeddings[j]);
            match best {
                Some((_, _, score)) if similarity <= score => {}
                _ => best = Some((i, j, similarity)),
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norms = l2_norm(a) * l2_norm(b);
    if norms == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / norms
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use crate::config::LlmConfig;
    use crate::sandbox::Sandbox;

    // ── cosine_similarity tests ─────────────────────────

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let a = vec![1.0, 2.0];
        let b = vec![10.0, 20.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    // ── most_similar_pair tests ─────────────────────────

    #[test]
    fn test_pair_finds_closest_vectors() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.9, 0.1],
            vec![-1.0, 0.0],
        ];
        // 0 and 2 point almost the same way
        assert_eq!(most_similar_pair(&embeddings), Some((0, 2)));
    }

    #[test]
    fn test_pair_never_matches_a_comment_with_itself() {
        // Duplicate vectors: the winning pair must still be two indices
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(most_similar_pair(&embeddings), Some((0, 1)));
    }

    #[test]
    fn test_pair_tie_keeps_first_in_scan_order() {
        // (0,1) and (2,3) are both perfect matches; first wins
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        assert_eq!(most_similar_pair(&embeddings), Some((0, 1)));
    }

    #[test]
    fn test_pair_needs_two_vectors() {
        assert_eq!(most_similar_pair(&[]), None);
        assert_eq!(most_similar_pair(&[vec![1.0]]), None);
    }

    #[test]
    fn test_pair_orders_indices_ascending() {
        let embeddings = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.05]];
        let (first, second) = most_similar_pair(&embeddings).unwrap();
        assert!(first < second);
        assert_eq!((first, second), (1, 2));
    }

    // ── batching arithmetic ─────────────────────────────

    #[test]
    fn test_batches_cover_all_comments_in_order() {
        let comments: Vec<String> = (0..45).map(|i| format!("comment {i}")).collect();
        let refs: Vec<&str> = comments.iter().map(String::as_str).collect();

        let batches: Vec<&[&str]> = refs.chunks(BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 20);
        assert_eq!(batches[1].len(), 20);
        assert_eq!(batches[2].len(), 5);
        assert_eq!(batches[0][0], "comment 0");
        assert_eq!(batches[2][4], "comment 44");
    }

    // ── execute failures ────────────────────────────────

    /// The endpoint is unroutable and never contacted; the failures
    /// under test fire before the first embeddings call.
    fn offline_op() -> SimilarCommentsOp {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 1,
        };
        SimilarCommentsOp::new(Arc::new(OpenAiClient::new(config)))
    }

    fn run_args(dir: &Path) -> TaskArgs {
        let sandbox = Sandbox::new(dir);
        let mut paths = BTreeMap::new();
        paths.insert(
            "input_file".to_string(),
            sandbox
                .resolve(dir.join("comments.txt").to_str().unwrap())
                .unwrap(),
        );
        paths.insert(
            "output_file".to_string(),
            sandbox
                .resolve(dir.join("pair.txt").to_str().unwrap())
                .unwrap(),
        );
        TaskArgs::new(serde_json::Map::new(), paths)
    }

    #[tokio::test]
    async fn test_execute_single_comment_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("comments.txt"), "only one comment\n").unwrap();

        let op = offline_op();
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("holds 1 comment(s)"));
        assert!(!dir.path().join("pair.txt").exists());
    }

    #[tokio::test]
    async fn test_execute_missing_input_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();

        let op = offline_op();
        let result = op.execute(&run_args(dir.path())).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("Cannot read"));
        assert!(!dir.path().join("pair.txt").exists());
    }
}
