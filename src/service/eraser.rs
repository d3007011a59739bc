//! Hard and soft deletion of profile records, mirrored on the linked user row.
//!
//! Each operation runs in a single transaction: lookup, record mutation and
//! user mutation either all commit or all roll back. Returning early with `?`
//! drops the transaction, which rolls it back.

use crate::config::{EntityTable, ModelName, ReferenceField};
use crate::error::AppError;
use crate::service::rows::row_to_json;
use crate::sql::{self, PgBindValue};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Fetch a non-deleted record by id, or fail with `<Model> not found`.
/// With `lock`, the row is held `FOR UPDATE` until the caller's transaction ends.
pub async fn find_active_by_id(
    conn: &mut PgConnection,
    schema: &str,
    entity: &EntityTable,
    id: Uuid,
    lock: bool,
) -> Result<Value, AppError> {
    let sql = sql::select_active_by_id(schema, entity, lock);
    tracing::debug!(sql = %sql, %id, "query");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", entity.model.label())))?;
    row_to_json(&row, entity.columns)
}

#[derive(Clone, Copy)]
pub struct RecordEraser<'a> {
    pool: &'a PgPool,
    schema: &'a str,
}

impl<'a> RecordEraser<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a str) -> Self {
        RecordEraser { pool, schema }
    }

    /// Delete the record and the user it references. Returns the deleted record.
    #[tracing::instrument(name = "Hard delete record", skip(self), fields(schema = %self.schema))]
    pub async fn delete_by_id(&self, model: ModelName, id: Uuid, reference: ReferenceField) -> Result<Value, AppError> {
        let entity = model.table();
        let mut tx = self.pool.begin().await?;

        find_active_by_id(&mut tx, self.schema, entity, id, true).await?;

        let row = sqlx::query(&sql::delete_by_id(self.schema, entity))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let deleted = row_to_json(&row, entity.columns)?;

        let key = reference_value(&deleted, model, reference)?;
        let affected = sqlx::query(&sql::delete_user_by(self.schema, reference))
            .bind(key)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        ensure_single_user(affected)?;

        tx.commit().await?;
        tracing::info!(%id, "record and linked user deleted");
        Ok(deleted)
    }

    /// Flag the record as deleted and mark its user `DELETED`. Returns the updated record.
    #[tracing::instrument(name = "Soft delete record", skip(self), fields(schema = %self.schema))]
    pub async fn soft_delete_by_id(
        &self,
        model: ModelName,
        id: Uuid,
        reference: ReferenceField,
    ) -> Result<Value, AppError> {
        let entity = model.table();
        let mut tx = self.pool.begin().await?;

        find_active_by_id(&mut tx, self.schema, entity, id, true).await?;

        let row = sqlx::query(&sql::mark_deleted(self.schema, entity))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = row_to_json(&row, entity.columns)?;

        let key = reference_value(&updated, model, reference)?;
        let affected = sqlx::query(&sql::mark_user_deleted(self.schema, reference))
            .bind(key)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        ensure_single_user(affected)?;

        tx.commit().await?;
        tracing::info!(%id, "record and linked user soft-deleted");
        Ok(updated)
    }
}

/// The value of the reference column on a record, typed for the `users` column it matches.
fn reference_value(record: &Value, model: ModelName, reference: ReferenceField) -> Result<PgBindValue, AppError> {
    let column = reference.record_column();
    match record.get(column) {
        None | Some(Value::Null) => Err(AppError::Internal(format!(
            "{} record has no value for reference field '{}'",
            model.label(),
            column
        ))),
        Some(v) => PgBindValue::for_column(reference.kind(), column, v)
            .map_err(|_| AppError::Internal(format!("{} reference field '{}' is malformed", model.label(), column))),
    }
}

/// The reference field is expected to be unique on `users`; anything else aborts the transaction.
fn ensure_single_user(affected: u64) -> Result<(), AppError> {
    match affected {
        1 => Ok(()),
        0 => Err(AppError::NotFound("User not found".into())),
        n => Err(AppError::Conflict(format!(
            "reference value matches {} users; expected exactly one",
            n
        ))),
    }
}
