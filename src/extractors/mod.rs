//! Request extractors that fail with `AppError`.

pub mod validated;
pub use validated::{parse_id, JsonBody, ValidatedJson, ValidatedPayload};
