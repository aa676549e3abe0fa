//! HTTP API server with observability for the marketplace.
//!
//! Provides REST endpoints for the catalog, orders and notifications,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::{LogDelivery, Marketplace, MarketplaceConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use search::{
    Backend, PostgresSearchIndex, RankedIndex, SearchIndex, SubstringIndex, select_backend,
};
use sqlx::PgPool;
use store::{InMemoryMarketStore, MarketStore, PostgresMarketStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::StartupError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub market: Marketplace,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/users", post(routes::users::register))
        .route(
            "/categories",
            get(routes::categories::list).post(routes::categories::create),
        )
        .route("/categories/{id}", delete(routes::categories::delete))
        .route(
            "/products",
            get(routes::products::list).post(routes::products::create),
        )
        .route("/products/mine", get(routes::products::mine))
        .route("/products/search", get(routes::products::search))
        // Slug on read, id on write
        .route(
            "/products/{key}",
            get(routes::products::get).patch(routes::products::update),
        )
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/confirm", post(routes::orders::confirm))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/ship", post(routes::orders::ship))
        .route("/orders/{id}/deliver", post(routes::orders::deliver))
        .route("/notifications", get(routes::notifications::list))
        .route(
            "/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read),
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

fn in_process_index(backend: Backend) -> Arc<dyn SearchIndex> {
    match backend {
        Backend::Substring => Arc::new(SubstringIndex::new()),
        _ => Arc::new(RankedIndex::new()),
    }
}

/// Creates an in-memory application state with the ranked search index and
/// log-only notification delivery.
pub fn create_default_state() -> Arc<AppState> {
    let market = Marketplace::new(
        Arc::new(InMemoryMarketStore::new()),
        Arc::new(RankedIndex::new()),
        Arc::new(LogDelivery),
        MarketplaceConfig::default(),
    );
    Arc::new(AppState { market })
}

/// Builds the application state described by `config`.
///
/// With a database URL the PostgreSQL store is migrated and native full-text
/// search is preferred; otherwise everything stays in memory. The search
/// backend is chosen once here by probing, then every product is reindexed so
/// entries lost to a failed refresh come back on restart.
pub async fn create_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let (store, candidates): (Arc<dyn MarketStore>, Vec<Arc<dyn SearchIndex>>) =
        match config.database_url.as_deref() {
            Some(url) => {
                let pool = PgPool::connect(url).await?;
                let store = PostgresMarketStore::new(pool.clone());
                store.run_migrations().await?;
                tracing::info!("connected to PostgreSQL and applied migrations");
                (
                    Arc::new(store) as Arc<dyn MarketStore>,
                    vec![
                        Arc::new(PostgresSearchIndex::new(pool)) as Arc<dyn SearchIndex>,
                        in_process_index(config.search_backend),
                    ],
                )
            }
            None => (
                Arc::new(InMemoryMarketStore::new()) as Arc<dyn MarketStore>,
                vec![in_process_index(config.search_backend)],
            ),
        };

    let index = select_backend(candidates).await;
    let market = Marketplace::new(
        store,
        index,
        Arc::new(LogDelivery),
        MarketplaceConfig::default().with_lock_timeout(config.lock_timeout),
    );
    market.rebuild_search_index().await?;

    Ok(Arc::new(AppState { market }))
}
