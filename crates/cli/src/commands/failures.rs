//! `autoflow failures` — recent failed executions with error details.

use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, Utc};

use db::repository::executions;

use super::truncate;

pub async fn execute(hours: i64, limit: i64, db: PathBuf) -> i32 {
    let Some(pool) = super::open_store(&db).await else {
        return 2;
    };

    let since = Utc::now() - ChronoDuration::hours(hours);
    let failures = match executions::failed_executions(&pool, since, limit).await {
        Ok(rows) => rows,
        Err(query_error) => {
            eprintln!("error: failed to get failed executions: {query_error}");
            pool.close().await;
            return 2;
        }
    };

    if failures.is_empty() {
        println!("✓ No failures found in the last {hours} hours.");
        pool.close().await;
        return 0;
    }

    println!("\n✗ Failed Executions (last {hours} hours)\n");
    println!(
        "{:<6} {:<24} {:<20} {:<10} {}",
        "ID", "WORKFLOW", "STARTED", "DURATION", "ERROR"
    );
    println!(
        "{:<6} {:<24} {:<20} {:<10} {}",
        "---", "--------", "-------", "--------", "-----"
    );

    for row in &failures {
        let duration = row
            .duration_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".into());
        let error = row
            .error
            .as_deref()
            .map(|e| truncate(e, 60))
            .unwrap_or_else(|| "-".into());

        println!(
            "{:<6} {:<24} {:<20} {:<10} {}",
            row.id,
            truncate(&row.workflow_name, 24),
            row.started_at.format("%Y-%m-%d %H:%M:%S"),
            duration,
            error,
        );
    }
    println!();

    pool.close().await;
    0
}
