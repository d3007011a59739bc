//! Profile routes. Handlers resolve the entity from the `:model` segment.

use crate::handlers::profiles::{delete as delete_handler, list, read, soft_delete, update};
use crate::state::AppState;
use axum::{routing::delete, routing::get, Router};

pub fn profile_routes(state: AppState) -> Router {
    Router::new()
        .route("/:model", get(list))
        .route("/:model/:id", get(read).patch(update).delete(delete_handler))
        .route("/:model/soft/:id", delete(soft_delete))
        .with_state(state)
}
