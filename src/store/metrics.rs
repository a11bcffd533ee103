// Append-only sample history.

use crate::models::MetricSample;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

const SELECT_COLUMNS: &str = "timestamp, cpu_percent, memory_percent, memory_used_gb, memory_total_gb,
     disk_percent, disk_used_gb, disk_total_gb, network_sent_mb, network_recv_mb,
     network_sent_rate, network_recv_rate, process_count, load_1m, load_5m, load_15m,
     temperature, battery_percent, battery_plugged";

pub struct MetricsRepo {
    pool: SqlitePool,
}

impl MetricsRepo {
    pub async fn connect(path: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = super::open_pool(path, max_connections).await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                cpu_percent REAL NOT NULL,
                memory_percent REAL NOT NULL,
                memory_used_gb REAL NOT NULL,
                memory_total_gb REAL NOT NULL,
                disk_percent REAL NOT NULL,
                disk_used_gb REAL NOT NULL,
                disk_total_gb REAL NOT NULL,
                network_sent_mb REAL NOT NULL,
                network_recv_mb REAL NOT NULL,
                network_sent_rate REAL NOT NULL,
                network_recv_rate REAL NOT NULL,
                process_count INTEGER NOT NULL,
                load_1m REAL NOT NULL,
                load_5m REAL NOT NULL,
                load_15m REAL NOT NULL,
                temperature REAL,
                battery_percent REAL,
                battery_plugged INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_timestamp ON samples(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self, sample), fields(repo = "metrics", operation = "insert_sample"))]
    pub async fn insert(&self, sample: &MetricSample) -> anyhow::Result<i64> {
        let r = sqlx::query(
            r#"
            INSERT INTO samples
            (timestamp, cpu_percent, memory_percent, memory_used_gb, memory_total_gb,
             disk_percent, disk_used_gb, disk_total_gb, network_sent_mb, network_recv_mb,
             network_sent_rate, network_recv_rate, process_count, load_1m, load_5m, load_15m,
             temperature, battery_percent, battery_plugged)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(sample.timestamp)
        .bind(sample.cpu_percent)
        .bind(sample.memory_percent)
        .bind(sample.memory_used_gb)
        .bind(sample.memory_total_gb)
        .bind(sample.disk_percent)
        .bind(sample.disk_used_gb)
        .bind(sample.disk_total_gb)
        .bind(sample.network_sent_mb)
        .bind(sample.network_recv_mb)
        .bind(sample.network_sent_rate)
        .bind(sample.network_recv_rate)
        .bind(sample.process_count as i64)
        .bind(sample.load_average[0])
        .bind(sample.load_average[1])
        .bind(sample.load_average[2])
        .bind(sample.temperature)
        .bind(sample.battery_percent)
        .bind(sample.battery_plugged)
        .execute(&self.pool)
        .await?;
        Ok(r.last_insert_rowid())
    }

    /// Most recent `limit` samples, oldest first.
    pub async fn recent(&self, limit: u32) -> anyhow::Result<Vec<MetricSample>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM samples ORDER BY id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = rows
            .iter()
            .map(parse_sample_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        out.reverse();
        Ok(out)
    }

    /// Samples strictly after `since`, ascending, at most `limit`.
    #[instrument(skip(self), fields(repo = "metrics", operation = "samples_since"))]
    pub async fn since(&self, since: f64, limit: u32) -> anyhow::Result<Vec<MetricSample>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM samples WHERE timestamp > $1 ORDER BY timestamp ASC LIMIT $2"
        ))
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_sample_row).collect()
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Deletes samples older than `cutoff`; returns the number removed.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_before"))]
    pub async fn prune_before(&self, cutoff: f64) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM samples WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool; later writes fail. Used on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_sample_row(row: &SqliteRow) -> anyhow::Result<MetricSample> {
    let process_count: i64 = row.try_get("process_count")?;
    Ok(MetricSample {
        timestamp: row.try_get("timestamp")?,
        cpu_percent: row.try_get("cpu_percent")?,
        memory_percent: row.try_get("memory_percent")?,
        memory_used_gb: row.try_get("memory_used_gb")?,
        memory_total_gb: row.try_get("memory_total_gb")?,
        disk_percent: row.try_get("disk_percent")?,
        disk_used_gb: row.try_get("disk_used_gb")?,
        disk_total_gb: row.try_get("disk_total_gb")?,
        network_sent_mb: row.try_get("network_sent_mb")?,
        network_recv_mb: row.try_get("network_recv_mb")?,
        network_sent_rate: row.try_get("network_sent_rate")?,
        network_recv_rate: row.try_get("network_recv_rate")?,
        process_count: process_count.clamp(0, u32::MAX as i64) as u32,
        load_average: [
            row.try_get("load_1m")?,
            row.try_get("load_5m")?,
            row.try_get("load_15m")?,
        ],
        temperature: row.try_get("temperature")?,
        battery_percent: row.try_get("battery_percent")?,
        battery_plugged: row.try_get("battery_plugged")?,
    })
}
