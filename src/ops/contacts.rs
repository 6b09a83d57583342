//! Multi-key sorting of JSON contact arrays.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Sorts a JSON array of contact objects by one or more keys.
///
/// Keys are compared in the order given, lexicographically as a tuple:
/// ties under the first key fall through to the second, and so on. The
/// sort is stable, so fully tied entries keep their input order.
pub struct SortContactsOp;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_file",
        ParamKind::Path,
        "JSON file containing an array of contact objects",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the sorted array is written to, as indented JSON",
    ),
    ParamSpec::required(
        "keys",
        ParamKind::TextArray,
        "Field names to sort by, in priority order, e.g. [\"last_name\", \"first_name\"]",
    ),
];

#[async_trait]
impl Operation for SortContactsOp {
    fn name(&self) -> &str {
        "sort_contacts"
    }

    fn description(&self) -> &str {
        "Sort an array of contacts stored as JSON by one or more fields (for \
         example last name, then first name) and write the sorted array to an \
         output file."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_file = args.path("input_file")?;
        let output_file = args.path("output_file")?;
        let keys = args.text_array("keys")?;

        if keys.is_empty() {
            return Ok(OperationResult::failure("No sort keys given."));
        }

        let content = match tokio::fs::read_to_string(input_file).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot read {input_file}: {e}"
                )))
            }
        };

        let mut contacts: Vec<Value> = match serde_json::from_str(&content) {
            Ok(contacts) => contacts,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "{input_file} is not a JSON array: {e}"
                )))
            }
        };

        // Every entry must carry every sort key; reporting the position
        // beats silently sorting nulls to the front.
        for (index, contact) in contacts.iter().enumerate() {
            for key in &keys {
                if contact.get(key).is_none() {
                    return Ok(OperationResult::failure(format!(
                        "Entry {index} has no '{key}' field."
                    )));
                }
            }
        }

        contacts.sort_by(|a, b| compare_by_keys(a, b, &keys));

        let sorted = serde_json::to_string_pretty(&contacts)?;
        tokio::fs::write(output_file, sorted).await?;

        Ok(OperationResult::ok(format!(
            "Sorted {} contacts by [{}] into {output_file}.",
            contacts.len(),
            keys.join(", ")
        ))
        .with_count(contacts.len() as u64))
    }
}

/// Tuple comparison: first key that differs decides.
fn compare_by_keys(a: &Value, b: &Value, keys: &[String]) -> Ordering {
    for key in keys {
        let ordering = compare_values(
            a.get(key).unwrap_or(&Value::Null),
            b.get(key).unwrap_or(&Value::Null),
        );
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values: scalars compare within their own type,
/// mixed types fall back to a fixed type rank, containers to their JSON
/// text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .partial_cmp(&y.as_f64().unwrap_or(f64::NAN))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use serde_json::json;

    use crate::sandbox::Sandbox;

    fn run_args(dir: &Path, keys: Value) -> TaskArgs {
        let sandbox = Sandbox::new(dir);
        let mut values = serde_json::Map::new();
        values.insert("keys".to_string(), keys);
        let mut paths = BTreeMap::new();
        paths.insert(
            "input_file".to_string(),
            sandbox
                .resolve(dir.join("contacts.json").to_str().unwrap())
                .unwrap(),
        );
        paths.insert(
            "output_file".to_string(),
            sandbox
                .resolve(dir.join("sorted.json").to_str().unwrap())
                .unwrap(),
        );
        TaskArgs::new(values, paths)
    }

    fn read_sorted(dir: &Path) -> Vec<Value> {
        let content = std::fs::read_to_string(dir.join("sorted.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    // ── comparison tests ────────────────────────────────

    #[test]
    fn test_compare_strings() {
        assert_eq!(
            compare_values(&json!("Adams"), &json!("Baker")),
            Ordering::Less
        );
        assert_eq!(compare_values(&json!("x"), &json!("x")), Ordering::Equal);
    }

    #[test]
    fn test_compare_numbers_including_floats() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
    }

    #[test]
    fn test_compare_mixed_types_by_rank() {
        // null < bool < number < string
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("1")), Ordering::Less);
    }

    #[test]
    fn test_compare_by_keys_falls_through_on_tie() {
        let a = json!({"last_name": "Ng", "first_name": "Ada"});
        let b = json!({"last_name": "Ng", "first_name": "Zoe"});
        let keys = vec!["last_name".to_string(), "first_name".to_string()];
        assert_eq!(compare_by_keys(&a, &b, &keys), Ordering::Less);
    }

    // ── execute tests ───────────────────────────────────

    #[tokio::test]
    async fn test_sorts_by_two_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("contacts.json"),
            json!([
                {"last_name": "Ng", "first_name": "Zoe"},
                {"last_name": "Adams", "first_name": "Rae"},
                {"last_name": "Ng", "first_name": "Ada"}
            ])
            .to_string(),
        )
        .unwrap();

        let op = SortContactsOp;
        let result = op
            .execute(&run_args(dir.path(), json!(["last_name", "first_name"])))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.count, Some(3));
        let sorted = read_sorted(dir.path());
        assert_eq!(sorted[0]["last_name"], "Adams");
        assert_eq!(sorted[1]["first_name"], "Ada");
        assert_eq!(sorted[2]["first_name"], "Zoe");
    }

    #[tokio::test]
    async fn test_sort_is_stable_for_full_ties() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("contacts.json"),
            json!([
                {"last_name": "Ng", "id": 1},
                {"last_name": "Ng", "id": 2},
                {"last_name": "Adams", "id": 3}
            ])
            .to_string(),
        )
        .unwrap();

        let op = SortContactsOp;
        op.execute(&run_args(dir.path(), json!(["last_name"])))
            .await
            .unwrap();

        let sorted = read_sorted(dir.path());
        // Tied Ng entries keep their input order
        assert_eq!(sorted[0]["id"], 3);
        assert_eq!(sorted[1]["id"], 1);
        assert_eq!(sorted[2]["id"], 2);
    }

    #[tokio::test]
    async fn test_output_is_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("contacts.json"),
            json!([{"last_name": "Ng"}]).to_string(),
        )
        .unwrap();

        let op = SortContactsOp;
        op.execute(&run_args(dir.path(), json!(["last_name"])))
            .await
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("sorted.json")).unwrap();
        assert!(content.contains('\n'));
        assert!(content.contains("  \"last_name\""));
    }

    #[tokio::test]
    async fn test_missing_sort_key_reports_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("contacts.json"),
            json!([
                {"last_name": "Ng", "first_name": "Ada"},
                {"last_name": "Adams"}
            ])
            .to_string(),
        )
        .unwrap();

        let op = SortContactsOp;
        let result = op
            .execute(&run_args(dir.path(), json!(["last_name", "first_name"])))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.message.contains("Entry 1"));
        assert!(result.message.contains("first_name"));
        assert!(!dir.path().join("sorted.json").exists());
    }

    #[tokio::test]
    async fn test_not_an_array_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("contacts.json"), "{\"not\": \"an array\"}").unwrap();

        let op = SortContactsOp;
        let result = op
            .execute(&run_args(dir.path(), json!(["last_name"])))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.message.contains("not a JSON array"));
    }

    #[tokio::test]
    async fn test_missing_input_file_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();

        let op = SortContactsOp;
        let result = op
            .execute(&run_args(dir.path(), json!(["last_name"])))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.message.contains("Cannot read"));
    }

    #[tokio::test]
    async fn test_empty_keys_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("contacts.json"), "[]").unwrap();

        let op = SortContactsOp;
        let result = op.execute(&run_args(dir.path(), json!([]))).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("No sort keys"));
    }
}
