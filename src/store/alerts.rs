// Persisted alerts. Rows are append-only apart from the one-shot acknowledgement update.

use crate::error::AckError;
use crate::models::{Alert, Severity};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

const SELECT_COLUMNS: &str = "id, timestamp, alert_type, metric_name, metric_value, threshold,
     severity, message, acknowledged, acknowledged_by, acknowledged_at";

pub struct AlertRepo {
    pool: SqlitePool,
}

impl AlertRepo {
    pub async fn connect(path: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = super::open_pool(path, max_connections).await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                alert_type TEXT NOT NULL,
                metric_name TEXT NOT NULL,
                metric_value REAL NOT NULL,
                threshold REAL NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                acknowledged INTEGER NOT NULL DEFAULT 0,
                acknowledged_by TEXT,
                acknowledged_at REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_type_timestamp ON alerts(alert_type, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts `alert` and returns the id assigned by the store.
    #[instrument(skip(self, alert), fields(repo = "alerts", operation = "insert_alert", alert_type = %alert.alert_type))]
    pub async fn insert(&self, alert: &Alert) -> anyhow::Result<i64> {
        let r = sqlx::query(
            r#"
            INSERT INTO alerts
            (timestamp, alert_type, metric_name, metric_value, threshold, severity, message,
             acknowledged, acknowledged_by, acknowledged_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(alert.timestamp)
        .bind(&alert.alert_type)
        .bind(&alert.metric_name)
        .bind(alert.metric_value)
        .bind(alert.threshold)
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(alert.acknowledged)
        .bind(&alert.acknowledged_by)
        .bind(alert.acknowledged_at)
        .execute(&self.pool)
        .await?;
        Ok(r.last_insert_rowid())
    }

    /// True when an alert of `alert_type` with `metric_value >= value` was
    /// recorded strictly after `since`.
    pub async fn has_recent_at_or_above(
        &self,
        alert_type: &str,
        value: f64,
        since: f64,
    ) -> anyhow::Result<bool> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM alerts WHERE alert_type = $1 AND metric_value >= $2 AND timestamp > $3",
        )
        .bind(alert_type)
        .bind(value)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(n > 0)
    }

    /// Most recent `limit` alerts, newest first.
    pub async fn recent(&self, limit: u32) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM alerts ORDER BY id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_alert_row).collect()
    }

    /// Alerts strictly after `since`, ascending.
    pub async fn since(&self, since: f64) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM alerts WHERE timestamp > $1 ORDER BY timestamp ASC, id ASC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_alert_row).collect()
    }

    pub async fn get(&self, id: i64) -> anyhow::Result<Option<Alert>> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM alerts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_alert_row).transpose()
    }

    /// Sets the acknowledgement fields once. A second acknowledgement is rejected.
    #[instrument(skip(self), fields(repo = "alerts", operation = "acknowledge"))]
    pub async fn acknowledge(&self, id: i64, by: &str, at: f64) -> Result<Alert, AckError> {
        let r = sqlx::query(
            "UPDATE alerts SET acknowledged = 1, acknowledged_by = $1, acknowledged_at = $2
             WHERE id = $3 AND acknowledged = 0",
        )
        .bind(by)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(anyhow::Error::from)?;

        let alert = self.get(id).await?.ok_or(AckError::NotFound(id))?;
        if r.rows_affected() == 0 {
            return Err(AckError::AlreadyAcknowledged(id));
        }
        Ok(alert)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_alert_row(row: &SqliteRow) -> anyhow::Result<Alert> {
    let severity: String = row.try_get("severity")?;
    Ok(Alert {
        id: Some(row.try_get("id")?),
        timestamp: row.try_get("timestamp")?,
        alert_type: row.try_get("alert_type")?,
        metric_name: row.try_get("metric_name")?,
        metric_value: row.try_get("metric_value")?,
        threshold: row.try_get("threshold")?,
        severity: severity.parse::<Severity>()?,
        message: row.try_get("message")?,
        acknowledged: row.try_get("acknowledged")?,
        acknowledged_by: row.try_get("acknowledged_by")?,
        acknowledged_at: row.try_get("acknowledged_at")?,
    })
}
