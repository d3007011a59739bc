//! Prescriptions: a fixed table with a jsonb medication list, so rows are typed
//! structs rather than registry-driven JSON.

use crate::error::AppError;
use crate::sql::qualified_table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

pub const PRESCRIPTIONS_TABLE: &str = "prescriptions";

const COLUMNS: &str = "id, appointment_id, issued_at, medications, notes, created_at, updated_at";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Validated body of `POST /prescription`.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPayload {
    pub appointment_id: String,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: String,
    pub issued_at: DateTime<Utc>,
    #[schema(value_type = Vec<Medication>)]
    pub medications: Json<Vec<Medication>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PrescriptionService;

impl PrescriptionService {
    #[tracing::instrument(name = "Create prescription", skip(pool, payload), fields(appointment_id = %payload.appointment_id))]
    pub async fn create(pool: &PgPool, schema: &str, payload: PrescriptionPayload) -> Result<Prescription, AppError> {
        let sql = format!(
            "INSERT INTO {} (id, appointment_id, issued_at, medications, notes) \
             VALUES ($1, $2, COALESCE($3, NOW()), $4, $5) RETURNING {}",
            qualified_table(schema, PRESCRIPTIONS_TABLE),
            COLUMNS
        );
        let created = sqlx::query_as::<_, Prescription>(&sql)
            .bind(Uuid::new_v4())
            .bind(&payload.appointment_id)
            .bind(payload.issued_at)
            .bind(Json(&payload.medications))
            .bind(&payload.notes)
            .fetch_one(pool)
            .await?;
        tracing::info!(id = %created.id, "prescription created");
        Ok(created)
    }

    pub async fn list(pool: &PgPool, schema: &str, page: u32, limit: u32) -> Result<(Vec<Prescription>, i64), AppError> {
        let table = qualified_table(schema, PRESCRIPTIONS_TABLE);
        let offset = (i64::from(page) - 1).max(0) * i64::from(limit);
        let rows = sqlx::query_as::<_, Prescription>(&format!(
            "SELECT {} FROM {} ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            COLUMNS, table
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(pool)
        .await?;
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn read(pool: &PgPool, schema: &str, id: Uuid) -> Result<Prescription, AppError> {
        sqlx::query_as::<_, Prescription>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            COLUMNS,
            qualified_table(schema, PRESCRIPTIONS_TABLE)
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Prescription not found".into()))
    }
}
