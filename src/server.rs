//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache tier composition, worker spawning,
//! and the Axum server lifecycle.

use crate::config::Config;
use crate::domain::click_worker::{ClickWorkerConfig, run_click_worker};
use crate::domain::sweeper::{SweeperConfig, run_sweeper};
use crate::infrastructure::analytics::{AnalyticsSink, NullAnalyticsSink, RedisAnalyticsSink};
use crate::infrastructure::cache::{MemoryCache, NullCache, RedisCache, TieredCache, UrlCache};
use crate::infrastructure::notifier::{
    HttpTransport, Notifier, WebhookWorkerConfig, run_webhook_worker,
};
use crate::infrastructure::persistence::{PgUrlRepository, PgUserRepository};
use crate::routes::app_router;
use crate::state::{AppState, StateOptions};

use anyhow::Result;
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool, with pending migrations applied
/// - The cache stack: in-process L1 always, Redis L2 when configured
///   (falling back to [`NullCache`] if the connection fails)
/// - The analytics sink (Redis stream, or the null sink without Redis)
/// - Background workers: click accounting, webhook delivery, sweeper
/// - Axum HTTP server with graceful shutdown on `SIGTERM` / `Ctrl-C`
///
/// # Shutdown
///
/// On signal the server stops accepting connections and finishes in-flight
/// requests. Teardown then runs in reverse construction order: the sweeper
/// is stopped, then the click and webhook queues drain as their senders
/// drop with the router state.
///
/// # Errors
///
/// Returns an error if the database connection, migration, or bind fails.
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate");

    let pos_ttl = Duration::from_secs(config.pos_cache_ttl_seconds);
    let neg_ttl = Duration::from_secs(config.neg_cache_ttl_seconds);
    let l1_ttl = Duration::from_secs(config.l1_cache_ttl_seconds);

    let l2: Arc<dyn UrlCache> = if let Some(cache_url) = &config.cache_url {
        match RedisCache::connect(cache_url, pos_ttl, neg_ttl).await {
            Ok(redis) => {
                tracing::info!("Shared cache tier enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. L1 cache only.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Shared cache tier disabled (L1 only)");
        Arc::new(NullCache::new())
    };

    let l1 = MemoryCache::new(
        config.l1_cache_capacity,
        l1_ttl,
        neg_ttl.min(l1_ttl),
    );
    let cache: Arc<dyn UrlCache> = Arc::new(TieredCache::new(l1, l2));

    let analytics: Arc<dyn AnalyticsSink> = match &config.cache_url {
        Some(cache_url) => match redis::Client::open(cache_url.as_str()) {
            Ok(client) => match redis::aio::ConnectionManager::new(client).await {
                Ok(manager) => Arc::new(RedisAnalyticsSink::new(manager)),
                Err(e) => {
                    tracing::warn!("Analytics sink unavailable: {}. Discarding clicks.", e);
                    Arc::new(NullAnalyticsSink)
                }
            },
            Err(e) => {
                tracing::warn!("Analytics sink unavailable: {}. Discarding clicks.", e);
                Arc::new(NullAnalyticsSink)
            }
        },
        None => Arc::new(NullAnalyticsSink),
    };

    // Repositories created once and shared between workers and state.
    let pool_arc = Arc::new(pool);
    let url_repo = Arc::new(PgUrlRepository::new(pool_arc.clone()));
    let user_repo = Arc::new(PgUserRepository::new(pool_arc.clone()));

    let (webhook_tx, webhook_rx) = mpsc::channel(config.webhook_queue_capacity);
    let notifier = Notifier::new(webhook_tx);

    let transport = Arc::new(HttpTransport::new(Duration::from_millis(
        config.webhook_timeout_ms,
    ))?);

    let webhook_handle = tokio::spawn(run_webhook_worker(
        webhook_rx,
        user_repo.clone(),
        transport,
        WebhookWorkerConfig {
            max_retries: config.webhook_max_retries,
            concurrency: config.click_worker_concurrency,
        },
    ));
    tracing::info!("Webhook worker started");

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);

    let click_handle = tokio::spawn(run_click_worker(
        click_rx,
        url_repo.clone(),
        analytics,
        notifier.clone(),
        ClickWorkerConfig {
            concurrency: config.click_worker_concurrency,
            webhook_sample_rate: config.click_webhook_sample_rate,
        },
    ));
    tracing::info!("Click worker started");

    let sweeper_handle = tokio::spawn(run_sweeper(
        url_repo.clone(),
        cache.clone(),
        notifier.clone(),
        SweeperConfig {
            interval: Duration::from_secs(config.sweep_interval_seconds),
            grace_days: config.hard_delete_grace_days,
        },
    ));

    let state = AppState::build(
        url_repo,
        user_repo,
        cache,
        notifier,
        click_tx,
        StateOptions {
            base_url: config.base_url.clone(),
            short_code_length: config.short_code_length,
            short_code_max_attempts: config.short_code_max_attempts,
            reserved_words: config.reserved_words.clone(),
            token_signing_secret: config.token_signing_secret.clone(),
            redirect_permanent: config.redirect_permanent,
        },
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // serve() has returned and the router state with it: the click and
    // webhook senders it held are gone. Stop the sweeper (it holds the
    // last notifier clone), then let both queues drain.
    tracing::info!("HTTP server stopped, draining workers...");
    sweeper_handle.abort();
    click_handle.await.ok();
    webhook_handle.await.ok();
    tracing::info!("Workers stopped, shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C (all platforms) or SIGTERM (Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
