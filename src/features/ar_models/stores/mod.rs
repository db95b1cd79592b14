//! Persistence for model records
//!
//! Services talk to an [`ArModelStore`] trait object so the Postgres store
//! used in production can be swapped for the in-memory store in tests.

mod memory_store;
mod pg_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::ar_models::models::{ArModel, NewArModel};

pub use memory_store::InMemoryArModelStore;
pub use pg_store::PgArModelStore;

/// Record fields that carry a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    ModelUrl,
    ArViewUrl,
    QrCodeData,
    QrCodeId,
}

impl UniqueField {
    /// Map a Postgres unique constraint name to the field it guards
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "ar_models_model_url_key" => Some(Self::ModelUrl),
            "ar_models_ar_view_url_key" => Some(Self::ArViewUrl),
            "ar_models_qr_code_data_key" => Some(Self::QrCodeData),
            "ar_models_qr_code_id_key" => Some(Self::QrCodeId),
            _ => None,
        }
    }
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ModelUrl => "model_url",
            Self::ArViewUrl => "ar_view_url",
            Self::QrCodeData => "qr_code_data",
            Self::QrCodeId => "qr_code_id",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A record with the same {0} already exists")]
    UniqueViolation(UniqueField),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(field) => {
                AppError::Conflict(format!("A model with the same {} already exists", field))
            }
            StoreError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

/// Persistence operations needed by the issuer, the resolver and the API.
///
/// All `find_active_*` lookups ignore records with `is_active = false`.
#[async_trait]
pub trait ArModelStore: Send + Sync {
    /// Whether any record, active or not, already uses `qr_code_id`
    async fn qr_code_id_exists(&self, qr_code_id: &str) -> StoreResult<bool>;

    async fn find_active_by_qr_code_id(&self, qr_code_id: &str) -> StoreResult<Option<ArModel>>;

    async fn find_active_by_qr_code_data(&self, qr_code_data: &str)
        -> StoreResult<Option<ArModel>>;

    /// Case-insensitive literal substring match on `qr_code_data`.
    /// When several records match, the most recently uploaded one is returned.
    async fn find_active_by_qr_code_data_fragment(
        &self,
        fragment: &str,
    ) -> StoreResult<Option<ArModel>>;

    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<ArModel>>;

    /// Active records, newest first, with the total number of active records
    async fn list_active(&self, offset: i64, limit: i64) -> StoreResult<(Vec<ArModel>, i64)>;

    /// Insert a record; duplicates of a unique field are rejected with
    /// [`StoreError::UniqueViolation`]
    async fn insert(&self, record: NewArModel) -> StoreResult<ArModel>;

    /// Atomically add one to `access_count` and set `last_accessed_at` on an
    /// active record. Returns the updated record, or `None` when no active
    /// record has that id.
    async fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<ArModel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_from_constraint() {
        assert_eq!(
            UniqueField::from_constraint("ar_models_qr_code_id_key"),
            Some(UniqueField::QrCodeId)
        );
        assert_eq!(
            UniqueField::from_constraint("ar_models_model_url_key"),
            Some(UniqueField::ModelUrl)
        );
        assert_eq!(UniqueField::from_constraint("ar_models_pkey"), None);
    }

    #[test]
    fn test_store_error_maps_to_app_error() {
        let conflict: AppError = StoreError::UniqueViolation(UniqueField::ModelUrl).into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let unavailable: AppError = StoreError::Unavailable("timeout".to_string()).into();
        assert!(matches!(unavailable, AppError::ServiceUnavailable(_)));
    }
}
