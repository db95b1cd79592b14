use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ArModelStore, StoreError, StoreResult, UniqueField};
use crate::features::ar_models::models::{ArModel, NewArModel};

const COLUMNS: &str = r#"
    id, stored_file_name, original_file_name, file_size_bytes, mime_type,
    model_url, ar_view_url, qr_code_url, qr_code_data, qr_code_id,
    uploaded_at, last_accessed_at, access_count, description, tags,
    is_active, created_at, updated_at
"#;

/// Convert database error to a store error, recognising unique violations
fn handle_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        // PostgreSQL unique_violation
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            if let Some(field) = db_err.constraint().and_then(UniqueField::from_constraint) {
                return StoreError::UniqueViolation(field);
            }
        }
    }

    tracing::error!("Record store error: {:?}", e);
    StoreError::Unavailable(e.to_string())
}

/// Postgres-backed record store
pub struct PgArModelStore {
    pool: PgPool,
}

impl PgArModelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, condition: &str, value: &str) -> StoreResult<Option<ArModel>> {
        let query = format!(
            "SELECT {} FROM ar_models WHERE {} AND is_active = TRUE LIMIT 1",
            COLUMNS, condition
        );

        sqlx::query_as::<_, ArModel>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(handle_db_error)
    }
}

#[async_trait]
impl ArModelStore for PgArModelStore {
    async fn qr_code_id_exists(&self, qr_code_id: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM ar_models WHERE qr_code_id = $1)",
        )
        .bind(qr_code_id)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn find_active_by_qr_code_id(&self, qr_code_id: &str) -> StoreResult<Option<ArModel>> {
        self.fetch_one_where("qr_code_id = $1", qr_code_id).await
    }

    async fn find_active_by_qr_code_data(
        &self,
        qr_code_data: &str,
    ) -> StoreResult<Option<ArModel>> {
        self.fetch_one_where("qr_code_data = $1", qr_code_data).await
    }

    async fn find_active_by_qr_code_data_fragment(
        &self,
        fragment: &str,
    ) -> StoreResult<Option<ArModel>> {
        // strpos keeps the fragment literal; LIKE/regex would interpret it
        let query = format!(
            r#"
            SELECT {} FROM ar_models
            WHERE strpos(lower(qr_code_data), lower($1)) > 0 AND is_active = TRUE
            ORDER BY uploaded_at DESC, created_at DESC, id DESC
            LIMIT 1
            "#,
            COLUMNS
        );

        sqlx::query_as::<_, ArModel>(&query)
            .bind(fragment)
            .fetch_optional(&self.pool)
            .await
            .map_err(handle_db_error)
    }

    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<ArModel>> {
        let query = format!(
            "SELECT {} FROM ar_models WHERE id = $1 AND is_active = TRUE",
            COLUMNS
        );

        sqlx::query_as::<_, ArModel>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(handle_db_error)
    }

    async fn list_active(&self, offset: i64, limit: i64) -> StoreResult<(Vec<ArModel>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ar_models WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await
                .map_err(handle_db_error)?;

        let query = format!(
            r#"
            SELECT {} FROM ar_models
            WHERE is_active = TRUE
            ORDER BY uploaded_at DESC, created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
            COLUMNS
        );

        let records = sqlx::query_as::<_, ArModel>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(handle_db_error)?;

        Ok((records, total))
    }

    async fn insert(&self, record: NewArModel) -> StoreResult<ArModel> {
        let query = format!(
            r#"
            INSERT INTO ar_models (
                stored_file_name, original_file_name, file_size_bytes, mime_type,
                model_url, ar_view_url, qr_code_url, qr_code_data, qr_code_id,
                uploaded_at, last_accessed_at, description, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $12)
            RETURNING {}
            "#,
            COLUMNS
        );

        sqlx::query_as::<_, ArModel>(&query)
            .bind(&record.stored_file_name)
            .bind(&record.original_file_name)
            .bind(record.file_size_bytes)
            .bind(&record.mime_type)
            .bind(&record.model_url)
            .bind(&record.ar_view_url)
            .bind(&record.qr_code_url)
            .bind(&record.qr_code_data)
            .bind(&record.qr_code_id)
            .bind(record.uploaded_at)
            .bind(&record.description)
            .bind(&record.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(handle_db_error)
    }

    async fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<ArModel>> {
        let query = format!(
            r#"
            UPDATE ar_models
            SET access_count = access_count + 1, last_accessed_at = $2, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            RETURNING {}
            "#,
            COLUMNS
        );

        sqlx::query_as::<_, ArModel>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(handle_db_error)
    }
}
