use axum::{
    Router,
    routing::{get, post},
};
use fx_core::CurrencyConverter;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::application::{ExchangeRateResolver, PurchaseStore, RateCache, RateSource};
use crate::domain::Clock;

/// Application state shared across handlers
pub struct AppState<P, S, K, C>
where
    P: PurchaseStore,
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    pub store: Arc<P>,
    pub resolver: Arc<ExchangeRateResolver<S, K, C>>,
    pub clock: Arc<C>,
    pub converter: CurrencyConverter,
    pub request_timeout: Duration,
}

impl<P, S, K, C> AppState<P, S, K, C>
where
    P: PurchaseStore,
    S: RateSource,
    K: RateCache,
    C: Clock,
{
    pub fn new(
        store: Arc<P>,
        resolver: Arc<ExchangeRateResolver<S, K, C>>,
        clock: Arc<C>,
        converter: CurrencyConverter,
        request_timeout: Duration,
    ) -> Self {
        AppState {
            store,
            resolver,
            clock,
            converter,
            request_timeout,
        }
    }
}

/// Create the REST API router
pub fn create_router<P, S, K, C>(state: Arc<AppState<P, S, K, C>>) -> Router
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    let request_timeout = state.request_timeout;

    Router::new()
        .route(
            "/api/v1/purchases",
            post(handlers::create_purchase::<P, S, K, C>),
        )
        .route(
            "/api/v1/purchases/{id}",
            get(handlers::get_purchase::<P, S, K, C>),
        )
        .route(
            "/api/v1/purchases/{id}/converted",
            get(handlers::get_converted_purchase::<P, S, K, C>),
        )
        .route("/health/live", get(handlers::live))
        .route("/health/ready", get(handlers::ready::<P, S, K, C>))
        // Middleware
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
