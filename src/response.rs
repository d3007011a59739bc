//! Success envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    pub data: T,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    respond(StatusCode::OK, message, None, data)
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    respond(StatusCode::CREATED, message, None, data)
}

pub fn paged<T: Serialize>(
    message: impl Into<String>,
    meta: PageMeta,
    data: Vec<T>,
) -> (StatusCode, Json<ApiResponse<Vec<T>>>) {
    respond(StatusCode::OK, message, Some(meta), data)
}

fn respond<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    meta: Option<PageMeta>,
    data: T,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            success: true,
            message: message.into(),
            meta,
            data,
        }),
    )
}
