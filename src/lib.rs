//! Clinic API: profile records linked to users, and prescriptions, over Postgres.

pub mod case;
pub mod config;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod normalizer;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use config::{EntityModel, Environment, ModelName, ReferenceField, Settings};
pub use error::AppError;
pub use normalizer::{ErrorBody, ErrorReport};
pub use routes::app;
pub use service::{PrescriptionService, ProfileService, RecordEraser};
pub use state::AppState;
pub use store::{connect_pool, ensure_database_exists, ensure_tables};
