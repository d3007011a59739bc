use crate::handlers::prescriptions::{create, list, read};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn prescription_routes(state: AppState) -> Router {
    Router::new()
        .route("/prescription", get(list).post(create))
        .route("/prescription/:id", get(read))
        .with_state(state)
}
