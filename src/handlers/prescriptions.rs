//! Prescription handlers.

use crate::error::{AppError, ValidationIssue};
use crate::extractors::{parse_id, ValidatedJson};
use crate::normalizer::ErrorBody;
use crate::response::{self, PageMeta};
use crate::service::prescriptions::{Prescription, PrescriptionPayload};
use crate::service::profiles::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
use crate::service::PrescriptionService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// Validated `(page, limit)`, with limit capped.
    fn resolve(&self) -> Result<(u32, u32), AppError> {
        let mut issues = Vec::new();
        let page = positive(self.page.as_deref(), DEFAULT_PAGE, "page", &mut issues);
        let limit = positive(self.limit.as_deref(), DEFAULT_LIMIT, "limit", &mut issues).min(MAX_LIMIT);
        if issues.is_empty() {
            Ok((page, limit))
        } else {
            Err(AppError::SchemaValidation(issues))
        }
    }
}

fn positive(raw: Option<&str>, default: u32, path: &str, issues: &mut Vec<ValidationIssue>) -> u32 {
    match raw.map(|s| s.trim().parse::<u32>()) {
        None => default,
        Some(Ok(n)) if n >= 1 => n,
        Some(_) => {
            issues.push(ValidationIssue::new(path, format!("{} must be a positive integer", path)));
            default
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/prescription",
    tag = "prescriptions",
    request_body = PrescriptionPayload,
    responses(
        (status = 201, description = "Prescription created", body = Prescription),
        (status = 400, description = "Body failed the prescription schema", body = ErrorBody)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PrescriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let created = PrescriptionService::create(&state.pool, state.schema(), payload).await?;
    Ok(response::created("Prescription created successfully", created))
}

#[utoipa::path(
    get,
    path = "/api/v1/prescription",
    tag = "prescriptions",
    params(
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Page of prescriptions, newest first", body = Vec<Prescription>)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, limit) = params.resolve()?;
    let (rows, total) = PrescriptionService::list(&state.pool, state.schema(), page, limit).await?;
    Ok(response::paged(
        "Prescriptions retrieved successfully",
        PageMeta { page, limit, total },
        rows,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/prescription/{id}",
    tag = "prescriptions",
    params(("id" = uuid::Uuid, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "The prescription", body = Prescription),
        (status = 404, description = "No such prescription", body = ErrorBody)
    )
)]
pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let found = PrescriptionService::read(&state.pool, state.schema(), id).await?;
    Ok(response::ok("Prescription retrieved successfully", found))
}
