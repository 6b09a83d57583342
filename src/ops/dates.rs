//! Weekday counting over line-oriented date files.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Accepted date formats, tried in order; first match wins.
const DATE_FORMATS: [&str; 4] = ["%Y/%m/%d %H:%M:%S", "%b %d, %Y", "%Y-%m-%d", "%d-%b-%Y"];

/// Counts how many dates in a file fall on a given weekday.
///
/// The input holds one date per line in any of the accepted formats;
/// blank and unparseable lines are skipped without failing the run.
pub struct CountWeekdaysOp;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "file_path",
        ParamKind::Path,
        "File containing one date per line, in mixed formats",
    ),
    ParamSpec::required(
        "weekday",
        ParamKind::Text,
        "Weekday name to count, e.g. 'Monday'",
    ),
    ParamSpec::required(
        "output_path",
        ParamKind::Path,
        "File the resulting count is written to",
    ),
];

#[async_trait]
impl Operation for CountWeekdaysOp {
    fn name(&self) -> &str {
        "count_weekdays"
    }

    fn description(&self) -> &str {
        "Count how many dates in a file fall on a specific weekday and write the \
         count to an output file. The input file contains one date per line in \
         mixed formats."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let file_path = args.path("file_path")?;
        let weekday_name = args.text("weekday")?;
        let output_path = args.path("output_path")?;

        let target: Weekday = match weekday_name.parse() {
            Ok(day) => day,
            Err(_) => {
                return Ok(OperationResult::failure(format!(
                    "Unknown weekday '{weekday_name}'."
                )))
            }
        };

        let content = match tokio::fs::read_to_string(file_path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot read {file_path}: {e}"
                )))
            }
        };

        let count = content
            .lines()
            .filter_map(|line| parse_date(line.trim()))
            .filter(|date| date.weekday() == target)
            .count() as u64;

        tokio::fs::write(output_path, count.to_string()).await?;

        Ok(OperationResult::ok(format!(
            "Counted {count} '{weekday_name}' dates from {file_path} into {output_path}."
        ))
        .with_count(count))
    }
}

/// Tries each accepted format in order.
fn parse_date(line: &str) -> Option<NaiveDate> {
    if line.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(line, format).ok())
}
