use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "centavo={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;

    if let Some(server) = settings.server {
        let db = db.clone();
        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let engine = match engine::Engine::builder()
                .database(db.clone())
                .build()
                .await
            {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine from database: {err}");
                    return;
                }
            };
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, db, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    if let Some(scheduler) = settings.scheduler {
        let db = db.clone();
        tasks.spawn(async move {
            tracing::info!("Found scheduler settings...");
            let engine = match engine::Engine::builder()
                .database(db.clone())
                .build()
                .await
            {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine from database: {err}");
                    return;
                }
            };

            let interval_secs = scheduler
                .interval_secs
                .unwrap_or(DEFAULT_SCHEDULER_INTERVAL_SECS);
            let mut timer = tokio::time::interval(Duration::from_secs(interval_secs));
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                match engine.run_billing_cycle(chrono::Utc::now()).await {
                    Ok(report) => tracing::info!(
                        processed = report.processed.len(),
                        skipped = report.skipped.len(),
                        "billing cycle finished"
                    ),
                    Err(err) => tracing::error!("billing cycle failed: {err}"),
                }
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let mut options = sea_orm::ConnectOptions::new(url);
    options
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5));

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
