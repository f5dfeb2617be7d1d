// Draft engine entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Open database, import catalog seed if configured
// 4. Construct hub, registry, and the draft service
// 5. Spawn the ingestion sync loop (when configured)
// 6. Run the WebSocket server until Ctrl+C

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};

use reel_draft::api::DraftService;
use reel_draft::catalog;
use reel_draft::config;
use reel_draft::db::Database;
use reel_draft::draft::registry::SessionRegistry;
use reel_draft::hub::BroadcastHub;
use reel_draft::ingest::{self, IngestClient};
use reel_draft::scoring::projection::BudgetHeuristic;
use reel_draft::ws_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("draft engine starting up");

    // 2. Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "draft.toml".to_string());
    let config =
        config::load_config(Path::new(&config_path)).context("failed to load configuration")?;
    info!(
        "config loaded: {}s pick window, {} rounds, ws port {}",
        config.draft.pick_seconds, config.draft.rounds, config.websocket.port
    );

    // 3. Open database and import the catalog seed
    let db = Arc::new(Database::open(&config.database.path).context("failed to open database")?);
    info!("database opened at {}", config.database.path);

    if let Some(seed) = &config.catalog.seed_csv {
        let imported = catalog::import_seed(&db, Path::new(seed))
            .context("failed to import catalog seed")?;
        info!("catalog seed processed ({imported} rows)");
    }

    // 4. Construct the service
    let hub = BroadcastHub::new(config.websocket.connection_queue);
    let registry = SessionRegistry::new();
    let service = Arc::new(DraftService::new(
        Arc::clone(&db),
        registry,
        hub,
        Arc::new(BudgetHeuristic),
        &config,
    ));

    // 5. Ingestion sync loop
    let ingest_handle = match IngestClient::from_config(&config.ingest) {
        IngestClient::Active(source) => {
            info!("ingestion enabled against {}", config.ingest.base_url);
            let sync_db = Arc::clone(&db);
            let interval = std::time::Duration::from_secs(config.ingest.sync_interval_minutes * 60);
            Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    let today = Utc::now().date_naive();
                    match ingest::sync_catalog(&sync_db, source.as_ref(), today).await {
                        Ok(report) => info!(
                            synced = report.synced,
                            failed = report.failed,
                            "scheduled sync finished"
                        ),
                        Err(e) => error!("scheduled sync failed: {e}"),
                    }
                }
            }))
        }
        IngestClient::Disabled => {
            info!("ingestion disabled (no base_url configured)");
            None
        }
    };

    // 6. Serve until interrupted
    let port = config.websocket.port;
    tokio::select! {
        result = ws_server::run(port, Arc::clone(&service)) => {
            if let Err(e) = result {
                error!("websocket server error: {e:#}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    if let Some(handle) = ingest_handle {
        handle.abort();
    }
    info!("draft engine shut down cleanly");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reel_draft=info,warn")),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}
