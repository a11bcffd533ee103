// Dump recent samples and alerts as JSON.
//
// Usage: cargo run --example dump_history -- [METRICS_DB] [ALERTS_DB] [LIMIT]
//   METRICS_DB  default: ./data/metrics.db
//   ALERTS_DB   default: ./data/alerts.db
//   LIMIT       default: 5

use overseer::store::{AlertRepo, MetricsRepo};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let metrics_path = args.get(1).map(String::as_str).unwrap_or("./data/metrics.db");
    let alerts_path = args.get(2).map(String::as_str).unwrap_or("./data/alerts.db");
    let limit: u32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(5);

    let metrics = MetricsRepo::connect(metrics_path, 1).await?;
    metrics.init().await?;
    let alerts = AlertRepo::connect(alerts_path, 1).await?;
    alerts.init().await?;

    let dump = serde_json::json!({
        "samples": metrics.recent(limit).await?,
        "alerts": alerts.recent(limit).await?,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);

    metrics.close().await;
    alerts.close().await;
    Ok(())
}
