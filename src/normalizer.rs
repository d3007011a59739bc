//! Turns every failure into the JSON error envelope.
//!
//! `AppError::into_response` classifies the error into an [`ErrorReport`],
//! renders it without a stack and stores the report in the response
//! extensions. The [`normalize_errors`] middleware then re-renders with the
//! stack in development, and wraps non-JSON error responses produced by the
//! framework itself (405, 413, ...) in the same envelope.

use crate::config::Environment;
use crate::error::{AppError, ErrorKind, KnownRequest, ValidationIssue};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use std::error::Error as StdError;
use utoipa::ToSchema;

pub const UNKNOWN_ERROR: &str = "Unknown Error";
pub const GENERIC_MESSAGE: &str = "Something went wrong";

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ErrorDetails {
    pub name: String,
    pub issues: Vec<ValidationIssue>,
}

/// Failure envelope.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub error_details: ErrorDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A classified error, independent of the environment it is rendered for.
#[derive(Clone, Debug)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    pub issues: Vec<ValidationIssue>,
    pub stack: Option<String>,
}

impl ErrorReport {
    pub fn from_error(err: &AppError) -> Self {
        let error = err.own_name().unwrap_or(UNKNOWN_ERROR).to_string();
        let message = match err.to_string() {
            m if m.trim().is_empty() => GENERIC_MESSAGE.to_string(),
            m => m,
        };
        let mut report = ErrorReport {
            status: err.own_status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            error,
            message,
            issues: Vec::new(),
            stack: Some(render_stack(err)),
        };

        match err.kind() {
            ErrorKind::SchemaValidation => {
                report.status = StatusCode::BAD_REQUEST;
                report.error = "ValidationError".into();
                report.issues = err.issues().to_vec();
            }
            ErrorKind::StorageValidation => {
                report.status = StatusCode::BAD_REQUEST;
                report.error = "StorageValidationError".into();
                report.message = "Invalid query input".into();
                report.issues = vec![ValidationIssue::new(storage_path(err), storage_message(err))];
            }
            ErrorKind::StorageKnownRequest(known) => {
                let (status, message) = known_request(known);
                report.status = status;
                report.error = "StorageKnownRequestError".into();
                report.message = message.into();
                if known != KnownRequest::RecordNotFound {
                    report.issues = vec![ValidationIssue::new(storage_path(err), storage_message(err))];
                }
            }
            ErrorKind::NotFound => {}
            ErrorKind::Unknown => {
                if let AppError::Db(_) = err {
                    report.message = GENERIC_MESSAGE.into();
                }
            }
        }
        report
    }

    /// Envelope for an error response the framework produced without an `AppError`.
    pub fn from_status(status: StatusCode) -> Self {
        let message = match status {
            StatusCode::PAYLOAD_TOO_LARGE => "Request body is too large".to_string(),
            StatusCode::METHOD_NOT_ALLOWED => "Method not allowed".to_string(),
            s => s.canonical_reason().unwrap_or(GENERIC_MESSAGE).to_string(),
        };
        ErrorReport {
            status,
            error: status.canonical_reason().unwrap_or(UNKNOWN_ERROR).to_string(),
            message,
            issues: Vec::new(),
            stack: None,
        }
    }

    pub fn body(&self, environment: Environment) -> ErrorBody {
        ErrorBody {
            success: false,
            error: self.error.clone(),
            message: self.message.clone(),
            error_details: ErrorDetails {
                name: self.error.clone(),
                issues: self.issues.clone(),
            },
            stack: self.stack.clone().filter(|_| environment.is_development()),
        }
    }

    pub fn render(&self, environment: Environment) -> Response {
        let mut response = (self.status, Json(self.body(environment))).into_response();
        response.extensions_mut().insert(self.clone());
        response
    }
}

fn known_request(known: KnownRequest) -> (StatusCode, &'static str) {
    match known {
        KnownRequest::RecordNotFound => (StatusCode::NOT_FOUND, "Record not found"),
        KnownRequest::UniqueViolation => (StatusCode::CONFLICT, "Duplicate value"),
        KnownRequest::ForeignKeyViolation => (StatusCode::BAD_REQUEST, "Related record constraint failed"),
        KnownRequest::NotNullViolation => (StatusCode::BAD_REQUEST, "Missing required value"),
        KnownRequest::CheckViolation => (StatusCode::BAD_REQUEST, "Value violates a check constraint"),
    }
}

/// Constraint or table named by the database, falling back to `query`.
fn storage_path(err: &AppError) -> String {
    match err {
        AppError::Db(sqlx::Error::Database(db)) => db
            .constraint()
            .or_else(|| db.table())
            .unwrap_or("query")
            .to_string(),
        AppError::Db(sqlx::Error::ColumnNotFound(column)) => column.clone(),
        _ => "query".to_string(),
    }
}

fn storage_message(err: &AppError) -> String {
    match err {
        AppError::Db(sqlx::Error::Database(db)) => db.message().to_string(),
        AppError::Db(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// The error and its source chain, one per line.
pub fn render_stack(err: &(dyn StdError + 'static)) -> String {
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_error(&self);
        if report.status.is_server_error() {
            tracing::error!(status = report.status.as_u16(), error = %report.error, cause = %self, "request failed");
        } else {
            tracing::warn!(status = report.status.as_u16(), error = %report.error, message = %report.message, "request rejected");
        }
        report.render(Environment::Production)
    }
}

/// Response middleware: stack gating for `AppError` responses and an envelope
/// for bare framework error responses.
pub async fn normalize_errors(State(environment): State<Environment>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    if let Some(report) = response.extensions().get::<ErrorReport>().cloned() {
        if environment.is_development() {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            let mut rendered = report.render(environment);
            *rendered.headers_mut() = parts.headers;
            return rendered;
        }
        return response;
    }

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }
    let report = ErrorReport::from_status(status);
    tracing::warn!(status = status.as_u16(), "framework error response normalized");
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let mut rendered = report.render(environment);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *rendered.headers_mut() = parts.headers;
    rendered
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// `CatchPanicLayer` handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::unknown(detail).into_response()
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("API not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_default_to_500() {
        let report = ErrorReport::from_error(&AppError::unknown("disk on fire"));
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(report.error, UNKNOWN_ERROR);
        assert_eq!(report.message, "disk on fire");
        assert!(report.issues.is_empty());
    }

    #[test]
    fn errors_with_their_own_name_and_status_keep_them() {
        let report = ErrorReport::from_error(&AppError::Conflict("taken".into()));
        assert_eq!(report.status, StatusCode::CONFLICT);
        assert_eq!(report.error, "ConflictError");

        let report = ErrorReport::from_error(&AppError::status(StatusCode::FORBIDDEN, "nope"));
        assert_eq!(report.status, StatusCode::FORBIDDEN);
        assert_eq!(report.error, "Forbidden");
    }

    #[test]
    fn schema_errors_list_every_issue() {
        let err = AppError::SchemaValidation(vec![
            ValidationIssue::new("appointmentId", "Appointment ID is required"),
            ValidationIssue::new("medications.0.dosage", "Dosage is required"),
        ]);
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.status, StatusCode::BAD_REQUEST);
        assert_eq!(report.error, "ValidationError");
        assert_eq!(report.message, "Appointment ID is required. Dosage is required");
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[1].path, "medications.0.dosage");
    }

    #[test]
    fn storage_errors_are_specialised() {
        let report = ErrorReport::from_error(&AppError::Db(sqlx::Error::RowNotFound));
        assert_eq!(report.status, StatusCode::NOT_FOUND);
        assert_eq!(report.error, "StorageKnownRequestError");
        assert_eq!(report.message, "Record not found");

        let report = ErrorReport::from_error(&AppError::Db(sqlx::Error::ColumnNotFound("nickname".into())));
        assert_eq!(report.status, StatusCode::BAD_REQUEST);
        assert_eq!(report.error, "StorageValidationError");
        assert_eq!(report.issues[0].path, "nickname");
    }

    #[test]
    fn other_storage_failures_hide_internals() {
        let report = ErrorReport::from_error(&AppError::Db(sqlx::Error::PoolTimedOut));
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(report.error, "DatabaseError");
        assert_eq!(report.message, GENERIC_MESSAGE);
    }

    #[test]
    fn stack_only_in_development() {
        let report = ErrorReport::from_error(&AppError::Db(sqlx::Error::PoolTimedOut));
        assert!(report.body(Environment::Production).stack.is_none());
        let stack = report.body(Environment::Development).stack.unwrap();
        assert!(stack.contains("caused by: pool timed out"));
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let body = ErrorReport::from_error(&AppError::NotFound("Admin not found".into())).body(Environment::Production);
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "NotFoundError");
        assert_eq!(v["errorDetails"]["name"], "NotFoundError");
        assert!(v.get("stack").is_none());
    }

    #[test]
    fn panic_payloads_become_unknown_errors() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.error, UNKNOWN_ERROR);
        assert_eq!(report.message, "boom");
    }

    #[test]
    fn framework_statuses_get_reason_names() {
        let report = ErrorReport::from_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(report.error, "Method Not Allowed");
        assert_eq!(report.message, "Method not allowed");
    }
}
