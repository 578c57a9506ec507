//! `autoflow history` — show workflow execution history.

use std::path::PathBuf;

use db::repository::executions;

use super::{status_glyph, truncate};

pub async fn execute(workflow: Option<String>, limit: i64, db: PathBuf) -> i32 {
    let Some(pool) = super::open_store(&db).await else {
        return 2;
    };

    let result = match &workflow {
        Some(name) => executions::workflow_history(&pool, name, limit).await,
        None => executions::all_history(&pool, limit).await,
    };

    let rows = match result {
        Ok(rows) => rows,
        Err(query_error) => {
            eprintln!("error: failed to get workflow history: {query_error}");
            pool.close().await;
            return 2;
        }
    };

    if rows.is_empty() {
        println!("No execution history found.");
        pool.close().await;
        return 0;
    }

    println!(
        "{:<6} {:<24} {:<12} {:<10} {:<20} {:<10} {}",
        "ID", "WORKFLOW", "STATUS", "TRIGGER", "STARTED", "DURATION", "ERROR"
    );
    println!(
        "{:<6} {:<24} {:<12} {:<10} {:<20} {:<10} {}",
        "---", "--------", "------", "-------", "-------", "--------", "-----"
    );

    for row in &rows {
        let duration = row
            .duration_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".into());
        let error = row
            .error
            .as_deref()
            .map(|e| truncate(e, 50))
            .unwrap_or_else(|| "-".into());

        println!(
            "{:<6} {:<24} {:<12} {:<10} {:<20} {:<10} {}",
            row.id,
            truncate(&row.workflow_name, 24),
            status_glyph(&row.status),
            row.trigger_type,
            row.started_at.format("%Y-%m-%d %H:%M:%S"),
            duration,
            error,
        );
    }

    pool.close().await;
    0
}
