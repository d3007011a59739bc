//! Typed errors and storage-error classification.
//!
//! Handlers return `Result<_, AppError>`; the only translation into an HTTP
//! response happens in [`crate::normalizer`].

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// One failing field of a request payload. `path` is dotted (`medications.0.name`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Request payload, path or query failed its schema.
    #[error("{}", join_issues(.0))]
    SchemaValidation(Vec<ValidationIssue>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// An error raised with an explicit HTTP status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
    /// Anything without a name of its own.
    #[error(transparent)]
    Unknown(Box<dyn std::error::Error + Send + Sync>),
}

/// Error taxonomy used by the normalizer to pick a formatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaValidation,
    StorageValidation,
    StorageKnownRequest(KnownRequest),
    NotFound,
    Unknown,
}

/// Storage failures caused by a well-formed request hitting a data rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownRequest {
    RecordNotFound,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
}

/// Result of inspecting a `sqlx::Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageClass {
    /// Malformed query input (bad value for a column, unknown column, decode failure).
    Validation,
    KnownRequest(KnownRequest),
    Other,
}

impl AppError {
    pub fn schema_issue(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::SchemaValidation(vec![ValidationIssue::new(path, message)])
    }

    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn unknown<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        AppError::Unknown(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::SchemaValidation(_) => ErrorKind::SchemaValidation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Db(e) => match classify_storage(e) {
                StorageClass::Validation => ErrorKind::StorageValidation,
                StorageClass::KnownRequest(k) => ErrorKind::StorageKnownRequest(k),
                StorageClass::Other => ErrorKind::Unknown,
            },
            AppError::Conflict(_) | AppError::Status { .. } | AppError::Internal(_) | AppError::Unknown(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// Status carried by the error itself, if any.
    pub fn own_status(&self) -> Option<StatusCode> {
        match self {
            AppError::SchemaValidation(_) => Some(StatusCode::BAD_REQUEST),
            AppError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            AppError::Conflict(_) => Some(StatusCode::CONFLICT),
            AppError::Status { status, .. } => Some(*status),
            AppError::Db(_) | AppError::Internal(_) | AppError::Unknown(_) => None,
        }
    }

    /// Name carried by the error itself, if any.
    pub fn own_name(&self) -> Option<&'static str> {
        match self {
            AppError::SchemaValidation(_) => Some("ValidationError"),
            AppError::NotFound(_) => Some("NotFoundError"),
            AppError::Conflict(_) => Some("ConflictError"),
            AppError::Status { status, .. } => status.canonical_reason(),
            AppError::Db(_) => Some("DatabaseError"),
            AppError::Internal(_) => Some("InternalError"),
            AppError::Unknown(_) => None,
        }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            AppError::SchemaValidation(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Classify a storage error by variant and, for server-reported errors, SQLSTATE.
pub fn classify_storage(err: &sqlx::Error) -> StorageClass {
    match err {
        sqlx::Error::RowNotFound => StorageClass::KnownRequest(KnownRequest::RecordNotFound),
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::Encode(_)
        | sqlx::Error::TypeNotFound { .. } => StorageClass::Validation,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| classify_sqlstate(&code))
            .unwrap_or(StorageClass::Other),
        _ => StorageClass::Other,
    }
}

pub fn classify_sqlstate(code: &str) -> StorageClass {
    match code {
        "23505" => StorageClass::KnownRequest(KnownRequest::UniqueViolation),
        "23503" => StorageClass::KnownRequest(KnownRequest::ForeignKeyViolation),
        "23502" => StorageClass::KnownRequest(KnownRequest::NotNullViolation),
        "23514" => StorageClass::KnownRequest(KnownRequest::CheckViolation),
        "42703" => StorageClass::Validation,
        c if c.starts_with("22") => StorageClass::Validation,
        _ => StorageClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("23505", StorageClass::KnownRequest(KnownRequest::UniqueViolation))]
    #[case("23503", StorageClass::KnownRequest(KnownRequest::ForeignKeyViolation))]
    #[case("23502", StorageClass::KnownRequest(KnownRequest::NotNullViolation))]
    #[case("23514", StorageClass::KnownRequest(KnownRequest::CheckViolation))]
    #[case("22P02", StorageClass::Validation)]
    #[case("22001", StorageClass::Validation)]
    #[case("42703", StorageClass::Validation)]
    #[case("40001", StorageClass::Other)]
    #[case("08006", StorageClass::Other)]
    fn sqlstate_classification(#[case] code: &str, #[case] expected: StorageClass) {
        assert_eq!(classify_sqlstate(code), expected);
    }

    #[test]
    fn row_not_found_is_a_known_request() {
        let err = AppError::Db(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::StorageKnownRequest(KnownRequest::RecordNotFound));
    }

    #[test]
    fn column_errors_are_storage_validation() {
        let err = AppError::Db(sqlx::Error::ColumnNotFound("nickname".into()));
        assert_eq!(err.kind(), ErrorKind::StorageValidation);
    }

    #[test]
    fn pool_failures_are_unknown() {
        let err = AppError::Db(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.own_status(), None);
        assert_eq!(err.own_name(), Some("DatabaseError"));
    }

    #[test]
    fn unknown_errors_carry_neither_name_nor_status() {
        let err = AppError::unknown("boom");
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.own_name(), None);
        assert_eq!(err.own_status(), None);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn schema_errors_join_issue_messages() {
        let err = AppError::SchemaValidation(vec![
            ValidationIssue::new("appointmentId", "Appointment ID is required"),
            ValidationIssue::new("medications", "At least one medication is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "Appointment ID is required. At least one medication is required"
        );
        assert_eq!(err.issues().len(), 2);
    }
}
