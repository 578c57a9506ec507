pub mod agent;
pub mod failures;
pub mod history;
pub mod run;
pub mod stats;
pub mod validate;

use std::path::Path;

use db::DbPool;

/// Open the history store, running migrations. `None` means the failure was
/// already reported and the caller should exit non-zero.
pub(crate) async fn open_store(db_path: &Path) -> Option<DbPool> {
    let pool = match db::pool::create_pool(db_path).await {
        Ok(pool) => pool,
        Err(error) => {
            eprintln!("error: failed to open history database: {error}");
            return None;
        }
    };
    if let Err(error) = db::pool::run_migrations(&pool).await {
        eprintln!("error: failed to run database migrations: {error}");
        return None;
    }
    Some(pool)
}

/// Clip long error text for table cells.
pub(crate) fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{clipped}...")
}

/// `✓ success` / `✗ failed` style status cells.
pub(crate) fn status_glyph(status: &str) -> String {
    match status {
        "success" => format!("✓ {status}"),
        "failed" => format!("✗ {status}"),
        other => other.to_string(),
    }
}
