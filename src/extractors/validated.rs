//! JSON body extraction with schema validation.

use crate::error::AppError;
use crate::service::prescriptions::PrescriptionPayload;
use crate::validation::{prescription_schema, Schema};
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// A JSON body of any shape. Malformed, absent or oversized bodies fail as `AppError`.
#[derive(Debug)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::schema_issue("body", "Expected request with `Content-Type: application/json`")
        }
        r if r.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::status(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
        }
        r => AppError::schema_issue("body", r.body_text()),
    }
}

/// A payload with a declarative schema checked before deserialization.
pub trait ValidatedPayload: DeserializeOwned {
    fn schema() -> &'static Schema;
}

impl ValidatedPayload for PrescriptionPayload {
    fn schema() -> &'static Schema {
        prescription_schema()
    }
}

/// Body validated against `T::schema()`, then deserialized.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: ValidatedPayload,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::from_request(req, state).await?;
        T::schema().validate(&value)?;
        serde_json::from_value(value)
            .map(ValidatedJson)
            .map_err(|e| AppError::schema_issue("body", e.to_string()))
    }
}

/// Parse a path id, reporting failures at `params.id`.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::schema_issue("params.id", "Invalid uuid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;
    use serde_json::json;

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn malformed_json_is_a_body_issue() {
        let err = JsonBody::from_request(request(Some("application/json"), "{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.issues()[0].path, "body");
    }

    #[tokio::test]
    async fn missing_content_type_is_a_body_issue() {
        let err = JsonBody::from_request(request(None, "{}"), &()).await.unwrap_err();
        assert!(err.issues()[0].message.contains("application/json"));
    }

    #[tokio::test]
    async fn validated_payload_reports_schema_issues() {
        let err = ValidatedJson::<PrescriptionPayload>::from_request(
            request(Some("application/json"), &json!({ "medications": [] }).to_string()),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.issues().len(), 2);
    }

    #[tokio::test]
    async fn validated_payload_deserializes() {
        let body = json!({
            "appointmentId": "apt-9",
            "medications": [{ "name": "Zinc", "dosage": "20mg", "frequency": "1x", "duration": "10 days" }]
        });
        let ValidatedJson(p) = ValidatedJson::<PrescriptionPayload>::from_request(
            request(Some("application/json"), &body.to_string()),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(p.appointment_id, "apt-9");
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(parse_id("4f9c6a0e-2b55-4a0b-8f7e-0d2c1b1e9a11").is_ok());
        let err = parse_id("42").unwrap_err();
        assert_eq!(err.issues()[0].path, "params.id");
    }
}
