//! Record eraser against a real Postgres. Each test runs in its own schema.
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

use clinic_api::sql::qualified_table;
use clinic_api::{ensure_tables, AppError, ModelName, RecordEraser, ReferenceField};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

struct TestDb {
    pool: PgPool,
    schema: String,
}

impl TestDb {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        let schema = format!("test_{}", Uuid::new_v4().simple());
        ensure_tables(&pool, &schema).await.unwrap();
        TestDb { pool, schema }
    }

    fn table(&self, name: &str) -> String {
        qualified_table(&self.schema, name)
    }

    async fn seed_user(&self, email: &str, role: &str) {
        sqlx::query(&format!(
            "INSERT INTO {} (email, role, password) VALUES ($1, $2::{}.\"user_role\", 'hashed')",
            self.table("users"),
            format!("\"{}\"", self.schema)
        ))
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    async fn seed_admin(&self, email: &str) -> Uuid {
        self.seed_user(email, "ADMIN").await;
        sqlx::query_scalar(&format!(
            "INSERT INTO {} (name, email, contact_number) VALUES ('Admin', $1, '01700000000') RETURNING id",
            self.table("admins")
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    async fn admin_is_deleted(&self, id: Uuid) -> Option<bool> {
        sqlx::query_scalar(&format!("SELECT is_deleted FROM {} WHERE id = $1", self.table("admins")))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap()
    }

    async fn user_status(&self, email: &str) -> Option<String> {
        sqlx::query_scalar(&format!(
            "SELECT status::text FROM {} WHERE email = $1",
            self.table("users")
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap()
    }

    fn eraser(&self) -> RecordEraser<'_> {
        RecordEraser::new(&self.pool, &self.schema)
    }

    async fn teardown(self) {
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn hard_delete_removes_record_and_user() {
    let db = TestDb::new().await;
    let id = db.seed_admin("gone@clinic.test").await;

    let deleted = db.eraser().delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap();

    assert_eq!(deleted["email"], "gone@clinic.test");
    assert_eq!(db.admin_is_deleted(id).await, None);
    assert_eq!(db.user_status("gone@clinic.test").await, None);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn soft_delete_flags_record_and_user() {
    let db = TestDb::new().await;
    let id = db.seed_admin("soft@clinic.test").await;

    let updated = db
        .eraser()
        .soft_delete_by_id(ModelName::Admin, id, ReferenceField::Email)
        .await
        .unwrap();

    assert_eq!(updated["is_deleted"], true);
    assert_eq!(db.admin_is_deleted(id).await, Some(true));
    assert_eq!(db.user_status("soft@clinic.test").await.as_deref(), Some("DELETED"));
    db.teardown().await;
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn missing_or_soft_deleted_records_are_not_found() {
    let db = TestDb::new().await;
    let missing = Uuid::new_v4();
    let err = db.eraser().delete_by_id(ModelName::Doctor, missing, ReferenceField::Email).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Doctor not found"));

    let id = db.seed_admin("twice@clinic.test").await;
    db.eraser().soft_delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap();
    let err = db.eraser().soft_delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = db.eraser().delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(db.admin_is_deleted(id).await, Some(true));
    db.teardown().await;
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn failed_user_delete_rolls_back_the_record() {
    let db = TestDb::new().await;
    let id = db.seed_admin("shared@clinic.test").await;
    // a doctor profile on the same user keeps the user row referenced
    sqlx::query(&format!(
        "INSERT INTO {} (name, email, contact_number, registration_number, gender, appointment_fee, \
         qualification, current_working_place, designation) \
         VALUES ('Doc', 'shared@clinic.test', '01700000001', 'R-1', 'FEMALE', 500, 'MBBS', 'City', 'GP')",
        db.table("doctors")
    ))
    .execute(&db.pool)
    .await
    .unwrap();

    let err = db.eraser().delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap_err();

    assert!(matches!(err, AppError::Db(_)));
    assert_eq!(db.admin_is_deleted(id).await, Some(false));
    assert_eq!(db.user_status("shared@clinic.test").await.as_deref(), Some("ACTIVE"));
    db.teardown().await;
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn failed_user_update_rolls_back_the_soft_delete() {
    let db = TestDb::new().await;
    let id = db.seed_admin("locked@clinic.test").await;
    let schema = format!("\"{}\"", db.schema);
    sqlx::query(&format!(
        "CREATE FUNCTION {}.refuse_status() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'status is locked'; END $$ LANGUAGE plpgsql",
        schema
    ))
    .execute(&db.pool)
    .await
    .unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER refuse_status BEFORE UPDATE ON {} FOR EACH ROW \
         WHEN (OLD.email = 'locked@clinic.test') EXECUTE FUNCTION {}.refuse_status()",
        db.table("users"),
        schema
    ))
    .execute(&db.pool)
    .await
    .unwrap();

    let err = db
        .eraser()
        .soft_delete_by_id(ModelName::Admin, id, ReferenceField::Email)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Db(_)));
    assert_eq!(db.admin_is_deleted(id).await, Some(false));
    assert_eq!(db.user_status("locked@clinic.test").await.as_deref(), Some("ACTIVE"));
    db.teardown().await;
}

#[tokio::test]
#[ignore = "requires a Postgres instance at DATABASE_URL"]
async fn unmatched_user_is_not_found_and_rolls_back() {
    let db = TestDb::new().await;
    let id = db.seed_admin("orphan@clinic.test").await;
    // without the foreign key the record can outlive its user
    sqlx::query(&format!(
        "ALTER TABLE {} DROP CONSTRAINT admins_email_fkey",
        db.table("admins")
    ))
    .execute(&db.pool)
    .await
    .unwrap();
    sqlx::query(&format!("DELETE FROM {}", db.table("users")))
        .execute(&db.pool)
        .await
        .unwrap();

    let err = db.eraser().soft_delete_by_id(ModelName::Admin, id, ReferenceField::Email).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(ref m) if m == "User not found"));
    assert_eq!(db.admin_is_deleted(id).await, Some(false));
    db.teardown().await;
}
