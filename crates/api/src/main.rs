//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use cache::{CacheManager, InMemoryCache, RedisCacheManager};
use messaging::{CacheInvalidationConsumer, ChannelEventBus};
use sale_store::{InMemorySaleRepository, PostgresSaleRepository, SaleRepository};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn connect_repository(config: &Config) -> Arc<dyn SaleRepository> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, keeping sales in memory");
        return Arc::new(InMemorySaleRepository::new());
    };

    let repository = PostgresSaleRepository::connect(url, DATABASE_MAX_CONNECTIONS)
        .await
        .expect("failed to connect to PostgreSQL");
    repository
        .run_migrations()
        .await
        .expect("failed to run migrations");
    tracing::info!("connected to PostgreSQL");
    Arc::new(repository)
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheManager> {
    let Some(url) = &config.redis_url else {
        tracing::warn!("REDIS_URL not set, using in-memory cache");
        return Arc::new(InMemoryCache::new());
    };

    // Reads fall back to the repository anyway, so a missing Redis is not fatal.
    match RedisCacheManager::connect(url).await {
        Ok(cache) => {
            tracing::info!("connected to Redis");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect backends
    let repository = connect_repository(&config).await;
    let cache = connect_cache(&config).await;

    // 4. Start the event dispatcher with cache invalidation subscribed
    let (bus, mut dispatcher) = ChannelEventBus::new();
    dispatcher.register(Arc::new(CacheInvalidationConsumer::new(cache.clone())));
    let dispatcher_task = dispatcher.spawn();

    // 5. Build the application
    let state = api::create_state(repository, cache, Arc::new(bus), config.cache_ttl());
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The router owned the last bus handle; the dispatcher drains and stops.
    if let Err(e) = dispatcher_task.await {
        tracing::warn!(error = %e, "event dispatcher ended abnormally");
    }

    tracing::info!("server shut down gracefully");
}
