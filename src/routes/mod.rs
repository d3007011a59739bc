//! Router assembly: API routes under `/api/v1`, probes at the root, and the
//! error-normalizing layers around everything.

mod common;
mod prescriptions;
mod profiles;

pub use common::common_routes;
pub use prescriptions::prescription_routes;
pub use profiles::profile_routes;

use crate::config::Environment;
use crate::normalizer::{normalize_errors, not_found, panic_response};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub const API_PREFIX: &str = "/api/v1";

/// The full application.
pub fn app(state: AppState) -> Router {
    let environment = state.environment();
    let body_limit = state.settings.max_request_body_bytes;

    let api = Router::new()
        .merge(prescription_routes(state.clone()))
        .merge(profile_routes(state.clone()));

    let router = Router::new()
        .merge(common_routes(state))
        .nest(API_PREFIX, api)
        .fallback(not_found);
    with_error_layers(router, environment, body_limit)
}

/// Wrap a router in the error-handling stack. Layer order, innermost first:
/// panic capture, body limit, error normalization, request tracing.
pub fn with_error_layers(router: Router, environment: Environment, body_limit: usize) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn_with_state(environment, normalize_errors))
        .layer(TraceLayer::new_for_http())
}
