//! Profile handlers, generic over the registry path segment (`admin`, `doctor`, `patient`).

use crate::case::camelize_row;
use crate::config::EntityTable;
use crate::error::AppError;
use crate::extractors::{parse_id, JsonBody};
use crate::normalizer::ErrorBody;
use crate::response::{self, PageMeta};
use crate::service::profiles::list_query_from_params;
use crate::service::{ProfileService, RecordEraser};
use crate::state::AppState;
use crate::validation::update_schema;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::Value;
use std::collections::HashMap;

fn entity(state: &AppState, segment: &str) -> Result<&'static EntityTable, AppError> {
    state
        .model
        .entity_by_path(segment)
        .ok_or_else(|| AppError::NotFound("API not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/{model}",
    tag = "profiles",
    params(
        ("model" = String, Path, description = "admin, doctor or patient"),
        ("searchTerm" = Option<String>, Query, description = "Case-insensitive substring over searchable columns"),
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, default 10, max 100"),
        ("sortBy" = Option<String>, Query, description = "Column, default createdAt"),
        ("sortOrder" = Option<String>, Query, description = "asc or desc, default desc")
    ),
    responses(
        (status = 200, description = "Page of non-deleted records"),
        (status = 400, description = "Invalid query", body = ErrorBody),
        (status = 404, description = "Unknown model", body = ErrorBody)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &model)?;
    let query = list_query_from_params(entity, &params)?;
    let (rows, total) = ProfileService::list(&state.pool, state.schema(), entity, &query).await?;
    let meta = PageMeta {
        page: query.page,
        limit: query.limit,
        total,
    };
    let data: Vec<Value> = rows.into_iter().map(camelize_row).collect();
    Ok(response::paged(format!("{}s retrieved successfully", entity.model.label()), meta, data))
}

#[utoipa::path(
    get,
    path = "/api/v1/{model}/{id}",
    tag = "profiles",
    params(
        ("model" = String, Path, description = "admin, doctor or patient"),
        ("id" = uuid::Uuid, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "The record"),
        (status = 404, description = "Absent or soft-deleted", body = ErrorBody)
    )
)]
pub async fn read(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &model)?;
    let id = parse_id(&id)?;
    let row = ProfileService::read(&state.pool, state.schema(), entity, id).await?;
    Ok(response::ok(
        format!("{} retrieved successfully", entity.model.label()),
        camelize_row(row),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/{model}/{id}",
    tag = "profiles",
    params(
        ("model" = String, Path, description = "admin, doctor or patient"),
        ("id" = uuid::Uuid, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "The updated record"),
        (status = 400, description = "Body failed the update schema", body = ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = ErrorBody)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &model)?;
    let id = parse_id(&id)?;
    update_schema(entity).validate(&body)?;
    let Value::Object(fields) = body else {
        return Err(AppError::schema_issue("body", "Expected an object"));
    };
    let row = ProfileService::update(&state.pool, state.schema(), entity, id, fields).await?;
    Ok(response::ok(
        format!("{} updated successfully", entity.model.label()),
        camelize_row(row),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{model}/{id}",
    tag = "profiles",
    params(
        ("model" = String, Path, description = "admin, doctor or patient"),
        ("id" = uuid::Uuid, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record and linked user deleted"),
        (status = 404, description = "Record or user absent", body = ErrorBody)
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &model)?;
    let id = parse_id(&id)?;
    let deleted = RecordEraser::new(&state.pool, state.schema())
        .delete_by_id(entity.model, id, entity.reference)
        .await?;
    Ok(response::ok(
        format!("{} deleted successfully", entity.model.label()),
        camelize_row(deleted),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{model}/soft/{id}",
    tag = "profiles",
    params(
        ("model" = String, Path, description = "admin, doctor or patient"),
        ("id" = uuid::Uuid, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record flagged deleted, linked user marked DELETED"),
        (status = 404, description = "Record or user absent", body = ErrorBody)
    )
)]
pub async fn soft_delete(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &model)?;
    let id = parse_id(&id)?;
    let updated = RecordEraser::new(&state.pool, state.schema())
        .soft_delete_by_id(entity.model, id, entity.reference)
        .await?;
    Ok(response::ok(
        format!("{} soft deleted successfully", entity.model.label()),
        camelize_row(updated),
    ))
}
