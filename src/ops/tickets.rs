//! Gold-ticket revenue aggregation over a SQLite database.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Sums `units * price` across all Gold rows of the `tickets` table.
///
/// The database is opened read-only; an empty Gold result is a total of
/// zero, not an error.
pub struct TicketSalesOp;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_file",
        ParamKind::Path,
        "SQLite database file with a tickets table",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the total is written to",
    ),
];

#[async_trait]
impl Operation for TicketSalesOp {
    fn name(&self) -> &str {
        "ticket_sales"
    }

    fn description(&self) -> &str {
        "Compute the total revenue of all 'Gold' ticket rows in a SQLite \
         database (sum of units times price) and write the total to an output \
         file."
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_file = args.path("input_file")?;
        let output_file = args.path("output_file")?;

        // Opening a missing file would create an empty database; check first
        if !input_file.as_path().exists() {
            return Ok(OperationResult::failure(format!(
                "Database {input_file} not found."
            )));
        }

        let db_path = input_file.as_path().to_path_buf();
        let total = tokio::task::spawn_blocking(move || gold_total(&db_path)).await?;
        let total = match total {
            Ok(total) => total,
            Err(e) => {
                return Ok(OperationResult::failure(format!("Database error: {e}")))
            }
        };

        tokio::fs::write(output_file, total.to_string()).await?;

        Ok(OperationResult::ok(format!(
            "Total Gold ticket sales: {total}"
        )))
    }
}

fn gold_total(path: &Path) -> rusqlite::Result<f64> {
    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let total: Option<f64> = connection.query_row(
        "SELECT SUM(units * price) FROM tickets WHERE type = 'Gold'",
        [],
        |row| row.get(0),
    )?;
    Ok(total.unwrap_or(0.0))
}
