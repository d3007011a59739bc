//! Database bootstrap: database, schema, enums and tables. All tables live in
//! the schema named by `DATABASE_SCHEMA` (default `public`).

use crate::config::Settings;
use crate::error::AppError;
use crate::service::prescriptions::PRESCRIPTIONS_TABLE;
use crate::sql::{qualified_table, quoted, USERS_TABLE};
use sqlx::postgres::PgPoolOptions;
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Create the pool described by `settings`.
pub async fn connect_pool(settings: &Settings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    Ok(pool)
}

/// Create the schema, the user enums and every table if they do not exist.
pub async fn ensure_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    for statement in table_ddl(schema) {
        sqlx::query(&statement).execute(pool).await?;
    }
    tracing::info!(%schema, "tables ready");
    Ok(())
}

fn create_enum(schema: &str, name: &str, variants: &[&str]) -> String {
    let labels = variants
        .iter()
        .map(|v| format!("'{}'", v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DO $$ BEGIN CREATE TYPE {}.{} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
        quoted(schema),
        quoted(name),
        labels
    )
}

/// Profile columns shared by admins, doctors and patients, followed by `extra`.
fn profile_table(schema: &str, table: &str, extra: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE REFERENCES {}(email) ON UPDATE CASCADE,
            profile_photo TEXT,
            contact_number TEXT NOT NULL,{}
            is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        qualified_table(schema, table),
        qualified_table(schema, USERS_TABLE),
        extra
    )
}

pub fn table_ddl(schema: &str) -> Vec<String> {
    let user_role = format!("{}.{}", quoted(schema), quoted("user_role"));
    let user_status = format!("{}.{}", quoted(schema), quoted("user_status"));
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)),
        create_enum(schema, "user_role", &["SUPER_ADMIN", "ADMIN", "DOCTOR", "PATIENT"]),
        create_enum(schema, "user_status", &["ACTIVE", "BLOCKED", "DELETED"]),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email TEXT NOT NULL UNIQUE,
                role {} NOT NULL,
                password TEXT NOT NULL,
                status {} NOT NULL DEFAULT 'ACTIVE',
                needs_password_change BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            qualified_table(schema, USERS_TABLE),
            user_role,
            user_status
        ),
        profile_table(schema, "admins", ""),
        profile_table(
            schema,
            "doctors",
            r#"
            address TEXT,
            registration_number TEXT NOT NULL,
            experience INTEGER NOT NULL DEFAULT 0,
            gender TEXT NOT NULL,
            appointment_fee INTEGER NOT NULL,
            qualification TEXT NOT NULL,
            current_working_place TEXT NOT NULL,
            designation TEXT NOT NULL,"#,
        ),
        profile_table(
            schema,
            "patients",
            r#"
            address TEXT,"#,
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                appointment_id TEXT NOT NULL,
                issued_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                medications JSONB NOT NULL,
                notes TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            qualified_table(schema, PRESCRIPTIONS_TABLE)
        ),
    ]
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::Internal("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
