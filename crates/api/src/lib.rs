//! HTTP API server with observability for the reservation engine.
//!
//! Provides REST endpoints for catalog reads, availability checks and the
//! reservation lifecycle, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use engine::{EngineConfig, InMemoryRoleDirectory, ReservationEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation_store::{CatalogStore, ReservationStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::reservations::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ReservationStore + CatalogStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/spaces", get(routes::catalog::spaces::<S>))
        .route("/elements", get(routes::catalog::elements::<S>))
        .route("/availability", get(routes::availability::space::<S>))
        .route("/availability/stock", post(routes::availability::stock::<S>))
        .route(
            "/reservations",
            post(routes::reservations::submit::<S>).get(routes::reservations::list::<S>),
        )
        .route("/reservations/pending", get(routes::reservations::pending::<S>))
        .route(
            "/reservations/{id}",
            get(routes::reservations::get::<S>).patch(routes::reservations::amend::<S>),
        )
        .route(
            "/reservations/{id}/history",
            get(routes::reservations::history::<S>),
        )
        .route(
            "/reservations/{id}/approve",
            post(routes::reservations::approve::<S>),
        )
        .route(
            "/reservations/{id}/reject",
            post(routes::reservations::reject::<S>),
        )
        .route(
            "/reservations/{id}/cancel",
            post(routes::reservations::cancel::<S>),
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

/// Creates the application state around a store and a role directory.
pub fn create_state<S: ReservationStore + CatalogStore + 'static>(
    store: S,
    directory: InMemoryRoleDirectory,
    config: EngineConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        engine: ReservationEngine::new(store, directory, config),
    })
}
