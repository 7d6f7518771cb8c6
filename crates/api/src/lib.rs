//! HTTP API server for the sales service.
//!
//! Exposes the sale use cases as REST endpoints wrapped in a common JSON
//! envelope, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use application::SaleService;
use axum::Router;
use axum::routing::{delete, get, patch, post};
use cache::{CacheManager, InMemoryCache};
use messaging::{CacheInvalidationConsumer, EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use sale_store::{InMemorySaleRepository, SaleRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::sales::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/sales",
            post(routes::sales::create).get(routes::sales::list),
        )
        .route(
            "/sales/{id}",
            get(routes::sales::get)
                .put(routes::sales::update)
                .delete(routes::sales::delete),
        )
        .route("/sales/{id}/cancel", patch(routes::sales::cancel))
        .route(
            "/sales/{sale_id}/items/{item_id}/cancel",
            patch(routes::sales::cancel_item),
        )
        .route(
            "/sales/{sale_id}/items/{item_id}",
            delete(routes::sales::delete_item),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the application state from its three backends.
pub fn create_state(
    repository: Arc<dyn SaleRepository>,
    cache: Arc<dyn CacheManager>,
    bus: Arc<dyn EventBus>,
    cache_ttl: Duration,
) -> Arc<AppState> {
    let sales = SaleService::new(repository, cache, bus).with_cache_ttl(cache_ttl);
    Arc::new(AppState { sales })
}

/// In-memory backends, wired the same way as the server.
pub struct InMemoryBackends {
    pub repository: Arc<InMemorySaleRepository>,
    pub cache: Arc<InMemoryCache>,
    pub bus: Arc<InMemoryEventBus>,
}

/// Creates application state backed entirely by memory, with cache
/// invalidation subscribed to the bus.
pub async fn create_default_state() -> (Arc<AppState>, InMemoryBackends) {
    let backends = InMemoryBackends {
        repository: Arc::new(InMemorySaleRepository::new()),
        cache: Arc::new(InMemoryCache::new()),
        bus: Arc::new(InMemoryEventBus::new()),
    };
    backends
        .bus
        .subscribe(Arc::new(CacheInvalidationConsumer::new(
            backends.cache.clone(),
        )))
        .await;

    let state = create_state(
        backends.repository.clone(),
        backends.cache.clone(),
        backends.bus.clone(),
        application::DEFAULT_CACHE_TTL,
    );
    (state, backends)
}
