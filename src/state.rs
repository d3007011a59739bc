//! Shared application state for all routes.

use crate::config::{EntityModel, Environment, Settings};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    /// Registry bound to the configured schema.
    pub model: Arc<EntityModel>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let model = EntityModel::new(settings.database_schema.clone());
        AppState {
            pool,
            settings: Arc::new(settings),
            model: Arc::new(model),
        }
    }

    pub fn schema(&self) -> &str {
        self.model.schema()
    }

    pub fn environment(&self) -> Environment {
        self.settings.environment
    }
}
