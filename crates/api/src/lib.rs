//! HTTP API surface for the storefront order transaction core.
//!
//! Exposes order placement, payment verification, and cancellation,
//! with structured logging (tracing) and Prometheus metrics. Request
//! shape validation happens here; existence and stock are re-validated
//! inside the checkout core.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::PaymentGateway;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S, G>))
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route(
            "/orders/{id}/verify-payment",
            post(routes::orders::verify_payment::<S, G>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, G>))
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
