use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use salesagent_agents::{CreativeAgentRegistry, FormatCacheStore, McpAgentClient};
use salesagent_core::agent::AgentDescriptor;
use salesagent_events::WebhookDelivery;
use salesagent_pipeline::{
    CreativeSyncPipeline, DbAgentSource, GeminiReviewer, Notifier, ReviewConfig, ReviewQueue,
    SyncConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesagent_api::config::ServerConfig;
use salesagent_api::router::build_app_router;
use salesagent_api::state::AppState;
use salesagent_api::background;

/// How long shutdown waits for each background task.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesagent_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = salesagent_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    salesagent_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    salesagent_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Creative agent registry ---
    let client = McpAgentClient::new(Duration::from_secs(config.agent_timeout_secs))
        .context("Failed to build creative agent client")?;
    let store = Arc::new(FormatCacheStore::new(&config.format_cache_path));
    let registry = Arc::new(
        CreativeAgentRegistry::new(
            Arc::new(client),
            AgentDescriptor::system_default(&config.default_agent_url),
        )
        .with_agent_source(Arc::new(DbAgentSource::new(pool.clone())))
        .with_ttl_seconds(config.format_cache_ttl_secs)
        .with_offline_store(store),
    );
    tracing::info!(default_agent = %config.default_agent_url, "Creative agent registry created");

    let cancel = CancellationToken::new();

    // --- Notifications ---
    let delivery = WebhookDelivery::new().context("Failed to build webhook client")?;
    let notifier = Notifier::new(delivery);

    // --- Sync pipeline and AI review ---
    let sync_config = SyncConfig::default().with_generation_api_key(config.gemini_api_key.clone());
    let mut pipeline = CreativeSyncPipeline::new(pool.clone(), Arc::clone(&registry), sync_config)
        .with_notifier(notifier.clone());

    let mut review_handles = Vec::new();
    match &config.gemini_api_key {
        Some(key) => {
            let reviewer = GeminiReviewer::new(key.clone(), config.gemini_model.clone())
                .context("Failed to build AI reviewer")?;
            let review_config = ReviewConfig {
                workers: config.review_workers,
                ..ReviewConfig::default()
            };
            let (queue, handles) = ReviewQueue::start(
                pool.clone(),
                Arc::new(reviewer),
                notifier,
                &review_config,
                cancel.clone(),
            );
            pipeline = pipeline.with_review_queue(queue);
            review_handles = handles;
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set; generative formats and AI review are disabled");
        }
    }

    // --- Background refresh ---
    let refresh_handle = tokio::spawn(background::format_cache_refresh::run(
        Arc::clone(&registry),
        Duration::from_secs(config.format_cache_refresh_secs),
        cancel.clone(),
    ));

    // --- App state and router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry,
        pipeline: Arc::new(pipeline),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    cancel.cancel();

    let _ = tokio::time::timeout(TASK_DRAIN_TIMEOUT, refresh_handle).await;
    for handle in review_handles {
        let _ = tokio::time::timeout(TASK_DRAIN_TIMEOUT, handle).await;
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
