//! `autoflow stats <workflow>` — success-rate statistics.

use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, Utc};

use db::repository::executions;

pub async fn execute(workflow: String, days: i64, db: PathBuf) -> i32 {
    let Some(pool) = super::open_store(&db).await else {
        return 2;
    };

    let since = Utc::now() - ChronoDuration::days(days);
    let stats = match executions::workflow_stats(&pool, &workflow, since).await {
        Ok(stats) => stats,
        Err(query_error) => {
            eprintln!("error: failed to get workflow stats: {query_error}");
            pool.close().await;
            return 2;
        }
    };

    if stats.total_executions == 0 {
        println!("No executions found for workflow '{workflow}' in the last {days} days.");
        pool.close().await;
        return 0;
    }

    println!("\nStatistics for workflow: {workflow} (last {days} days)\n");
    println!("{:<20} VALUE", "METRIC");
    println!("{:<20} -----", "------");
    println!("{:<20} {}", "Total Executions", stats.total_executions);
    println!("{:<20} {} (✓)", "Successful", stats.success_count);
    println!("{:<20} {} (✗)", "Failed", stats.failed_count);
    println!("{:<20} {:.2}%", "Success Rate", stats.success_rate);
    if stats.avg_duration_ms > 0.0 {
        if stats.avg_duration_ms < 1000.0 {
            println!("{:<20} {:.2}ms", "Avg Duration", stats.avg_duration_ms);
        } else {
            println!("{:<20} {:.2}s", "Avg Duration", stats.avg_duration_ms / 1000.0);
        }
    } else {
        println!("{:<20} -", "Avg Duration");
    }
    println!();

    pool.close().await;
    0
}
