//! Convert JSON values into typed Postgres bind parameters.

use crate::config::ColumnKind;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value bound to a query. Each variant reports its own Postgres type, so a
/// `uuid` column is never compared against a `text` parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null(ColumnKind),
    Bool(bool),
    I64(i64),
    Text(String),
    Uuid(uuid::Uuid),
    Timestamp(DateTime<Utc>),
}

impl PgBindValue {
    /// Coerce a JSON value to the column's storage type.
    pub fn for_column(kind: ColumnKind, column: &str, v: &Value) -> Result<Self, AppError> {
        let mismatch = || AppError::schema_issue(column, format!("Invalid value for {}", column));
        Ok(match (kind, v) {
            (_, Value::Null) => PgBindValue::Null(kind),
            (ColumnKind::Text, Value::String(s)) => PgBindValue::Text(s.clone()),
            (ColumnKind::Text, Value::Number(n)) => PgBindValue::Text(n.to_string()),
            (ColumnKind::Uuid, Value::String(s)) => {
                PgBindValue::Uuid(uuid::Uuid::parse_str(s).map_err(|_| mismatch())?)
            }
            (ColumnKind::Integer, Value::Number(n)) => PgBindValue::I64(n.as_i64().ok_or_else(mismatch)?),
            (ColumnKind::Integer, Value::String(s)) => PgBindValue::I64(s.trim().parse().map_err(|_| mismatch())?),
            (ColumnKind::Boolean, Value::Bool(b)) => PgBindValue::Bool(*b),
            (ColumnKind::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => PgBindValue::Bool(true),
                "false" => PgBindValue::Bool(false),
                _ => return Err(mismatch()),
            },
            (ColumnKind::Timestamp, Value::String(s)) => PgBindValue::Timestamp(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            _ => return Err(mismatch()),
        })
    }

    fn pg_type(&self) -> PgTypeInfo {
        match self {
            PgBindValue::Null(kind) => kind_type(*kind),
            PgBindValue::Bool(_) => kind_type(ColumnKind::Boolean),
            PgBindValue::I64(_) => kind_type(ColumnKind::Integer),
            PgBindValue::Text(_) => kind_type(ColumnKind::Text),
            PgBindValue::Uuid(_) => kind_type(ColumnKind::Uuid),
            PgBindValue::Timestamp(_) => kind_type(ColumnKind::Timestamp),
        }
    }
}

fn kind_type(kind: ColumnKind) -> PgTypeInfo {
    match kind {
        ColumnKind::Uuid => <uuid::Uuid as Type<Postgres>>::type_info(),
        ColumnKind::Text => <String as Type<Postgres>>::type_info(),
        ColumnKind::Integer => <i64 as Type<Postgres>>::type_info(),
        ColumnKind::Boolean => <bool as Type<Postgres>>::type_info(),
        ColumnKind::Timestamp => <DateTime<Utc> as Type<Postgres>>::type_info(),
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Null(_) => Ok(IsNull::Yes),
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            PgBindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.pg_type())
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
