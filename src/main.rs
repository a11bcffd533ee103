use anyhow::Result;
use clap::Parser;
use overseer::cli::{Cli, Commands, DashboardArgs};
use overseer::config::AppConfig;
use overseer::context::AppContext;
use overseer::dashboard::{self, DashboardState};
use overseer::models::now_secs;
use overseer::source::SysinfoSource;
use overseer::store::AlertRepo;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Stdout logging, or a log file while the dashboard owns the terminal.
fn init_tracing(command: &Commands, config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter);
    if matches!(command, Commands::Dashboard(_)) {
        let path = std::path::Path::new(&config.logging.dashboard_log);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("opening log file {}: {}", path.display(), e))?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();
    let app_config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&command, &app_config)?;

    match command {
        Commands::Dashboard(args) => run_dashboard(app_config, args).await,
        Commands::Serve => run_server(app_config).await,
        Commands::Alerts { limit } => print_alerts(&app_config, limit).await,
        Commands::Ack { id, by } => acknowledge(&app_config, id, &by).await,
        Commands::Rules => print_rules(&app_config),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn join_background(ctx: &AppContext, handles: Vec<tokio::task::JoinHandle<()>>) {
    ctx.shutdown();
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "background task ended abnormally");
        }
    }
    ctx.close().await;
}

async fn run_dashboard(app_config: AppConfig, args: DashboardArgs) -> Result<()> {
    let state = DashboardState::new(
        args.view.unwrap_or(app_config.dashboard.default_view),
        args.refresh.unwrap_or(app_config.dashboard.refresh_rate),
    )
    .with_process_limit(app_config.monitoring.process_limit);
    let ctx = AppContext::build(app_config).await?;
    let handles = ctx.spawn_background(Arc::new(SysinfoSource::new()));
    tracing::info!(refresh_secs = state.refresh_rate, "dashboard starting");

    let snapshots = ctx.snapshots();
    let shutdown_tx = ctx.shutdown_sender();
    let mut ui = tokio::task::spawn_blocking(move || dashboard::run(snapshots, state, shutdown_tx));
    let result = tokio::select! {
        r = &mut ui => r,
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            ctx.shutdown();
            ui.await
        }
    };

    join_background(&ctx, handles).await;
    result.map_err(|e| anyhow::anyhow!("dashboard task: {}", e))?
}

async fn run_server(app_config: AppConfig) -> Result<()> {
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let ctx = AppContext::build(app_config).await?;
    let handles = ctx.spawn_background(Arc::new(SysinfoSource::new()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let result = tokio::select! {
        result = axum::serve(listener, ctx.router()) => result.map_err(anyhow::Error::from),
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };

    join_background(&ctx, handles).await;
    result
}

async fn open_alerts(app_config: &AppConfig) -> Result<AlertRepo> {
    let db = &app_config.database;
    let repo = AlertRepo::connect(&db.alerts_path, db.max_pool_size).await?;
    repo.init().await?;
    Ok(repo)
}

async fn print_alerts(app_config: &AppConfig, limit: u32) -> Result<()> {
    let repo = open_alerts(app_config).await?;
    let alerts = repo.recent(limit).await?;
    if alerts.is_empty() {
        println!("no alerts");
    }
    for alert in alerts {
        let ack = match (alert.acknowledged, alert.acknowledged_by.as_deref()) {
            (true, Some(by)) => format!(" [ack by {}]", by),
            (true, None) => " [ack]".to_string(),
            (false, _) => String::new(),
        };
        println!(
            "{:>6}  {}  {:<8}  {}{}",
            alert.id.unwrap_or_default(),
            chrono::DateTime::from_timestamp(alert.timestamp as i64, 0)
                .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            alert.severity,
            alert.message,
            ack
        );
    }
    repo.close().await;
    Ok(())
}

async fn acknowledge(app_config: &AppConfig, id: i64, by: &str) -> Result<()> {
    let repo = open_alerts(app_config).await?;
    let result = repo.acknowledge(id, by, now_secs()).await;
    repo.close().await;
    let alert = result?;
    println!(
        "acknowledged alert {} ({}) by {}",
        id,
        alert.alert_type,
        alert.acknowledged_by.as_deref().unwrap_or(by)
    );
    Ok(())
}

fn print_rules(app_config: &AppConfig) -> Result<()> {
    let rules = app_config.rule_set()?;
    for rule in rules.rules() {
        println!(
            "{:<22} {:<16} >= {:>6.1}  {:<8} {}",
            rule.rule_name,
            rule.metric_name,
            rule.threshold,
            rule.severity,
            if rule.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}
