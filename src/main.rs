use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use villagerdb::{
    api::{build_router, AppState},
    config::{Config, ObservabilityConfig},
    indexer::Indexer,
    metrics,
    scheduler::{register_indexer_jobs, SchedulerService},
    search::{SearchIndexStore, TantivyIndexStore, TownSearch},
    state::create_stores,
    towns::TownService,
};

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "villagerdb={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.observability);

    tracing::info!(
        service = %config.observability.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting VillagerDB"
    );

    if config.observability.prometheus_enabled {
        metrics::init_metrics();
    }

    // Storage
    tracing::info!(
        backend = ?config.state.backend,
        pointer = ?config.state.pointer_backend,
        "Initializing storage"
    );
    let stores = create_stores(&config.state).await?;

    let search_store: Arc<dyn SearchIndexStore> =
        Arc::new(TantivyIndexStore::new(config.search.clone())?);

    let indexer = Arc::new(Indexer::new(
        stores.documents.clone(),
        stores.change_log.clone(),
        search_store.clone(),
        stores.pointer.clone(),
        config.indexer.clone(),
    ));

    if config.indexer.sweep_on_start {
        match indexer.sweep_orphans().await {
            Ok(report) if !report.removed.is_empty() => {
                tracing::info!(removed = ?report.removed, "Removed orphaned generations on start")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Orphan sweep on start failed"),
        }
    }

    match indexer.live_generation().await? {
        Some(generation) => tracing::info!(generation = %generation, "Serving live generation"),
        None => tracing::warn!(
            index = %config.indexer.index_name,
            "No live generation; run a full reindex to populate search"
        ),
    }

    // Scheduled jobs
    let mut scheduler = SchedulerService::new(config.scheduler.clone()).await?;
    if config.scheduler.enabled {
        let jobs = register_indexer_jobs(&scheduler, indexer.clone(), &config.scheduler).await?;
        tracing::info!(jobs = jobs.len(), "Indexer jobs registered");
    }
    scheduler.start().await?;

    // HTTP API
    let town_search = Arc::new(TownSearch::new(
        search_store,
        stores.pointer.clone(),
        config.indexer.index_name.clone(),
        config.search.clone(),
    ));
    let state = AppState::new(TownService::new(stores.documents.clone()), town_search, indexer)
        .with_prometheus(config.observability.prometheus_enabled);
    let app = build_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("HTTP API listening on http://{}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }

    Ok(())
}
