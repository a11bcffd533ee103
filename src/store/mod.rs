// SQLite record stores. One database file per concern, no cross-store keys.
// Each repo owns its own pool so the sampling task and readers never share a connection.

mod alerts;
mod metrics;

pub use alerts::AlertRepo;
pub use metrics::MetricsRepo;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Opens (and creates if missing) a WAL-mode SQLite pool at `path`.
pub(crate) async fn open_pool(path: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await?;
    Ok(pool)
}
