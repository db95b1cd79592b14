use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ArModelStore, StoreError, StoreResult, UniqueField};
use crate::features::ar_models::models::{ArModel, NewArModel};

/// Process-local record store.
///
/// Enforces the same unique fields as the Postgres table. Records are kept
/// in insertion order, which breaks ties between equal upload times.
#[derive(Default)]
pub struct InMemoryArModelStore {
    records: RwLock<Vec<ArModel>>,
}

impl InMemoryArModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a record inactive
    #[cfg(test)]
    pub async fn deactivate(&self, id: Uuid) -> bool {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.is_active = false;
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Current state of a record regardless of its active flag
    #[cfg(test)]
    pub async fn get(&self, id: Uuid) -> Option<ArModel> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    fn find_active<F>(records: &[ArModel], predicate: F) -> Option<ArModel>
    where
        F: Fn(&ArModel) -> bool,
    {
        records
            .iter()
            .find(|r| r.is_active && predicate(r))
            .cloned()
    }

    fn duplicate_field(records: &[ArModel], new: &NewArModel) -> Option<UniqueField> {
        records.iter().find_map(|r| {
            if r.model_url == new.model_url {
                Some(UniqueField::ModelUrl)
            } else if r.ar_view_url == new.ar_view_url {
                Some(UniqueField::ArViewUrl)
            } else if r.qr_code_data == new.qr_code_data {
                Some(UniqueField::QrCodeData)
            } else if r.qr_code_id == new.qr_code_id {
                Some(UniqueField::QrCodeId)
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl ArModelStore for InMemoryArModelStore {
    async fn qr_code_id_exists(&self, qr_code_id: &str) -> StoreResult<bool> {
        let records = self.records.read().await;
        Ok(records.iter().any(|r| r.qr_code_id == qr_code_id))
    }

    async fn find_active_by_qr_code_id(&self, qr_code_id: &str) -> StoreResult<Option<ArModel>> {
        let records = self.records.read().await;
        Ok(Self::find_active(&records, |r| r.qr_code_id == qr_code_id))
    }

    async fn find_active_by_qr_code_data(
        &self,
        qr_code_data: &str,
    ) -> StoreResult<Option<ArModel>> {
        let records = self.records.read().await;
        Ok(Self::find_active(&records, |r| r.qr_code_data == qr_code_data))
    }

    async fn find_active_by_qr_code_data_fragment(
        &self,
        fragment: &str,
    ) -> StoreResult<Option<ArModel>> {
        let needle = fragment.to_lowercase();
        let records = self.records.read().await;

        // Latest insertion wins among equal upload times
        let best = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active && r.qr_code_data.to_lowercase().contains(&needle))
            .max_by_key(|(position, r)| (r.uploaded_at, *position))
            .map(|(_, r)| r.clone());

        Ok(best)
    }

    async fn find_active_by_id(&self, id: Uuid) -> StoreResult<Option<ArModel>> {
        let records = self.records.read().await;
        Ok(Self::find_active(&records, |r| r.id == id))
    }

    async fn list_active(&self, offset: i64, limit: i64) -> StoreResult<(Vec<ArModel>, i64)> {
        let records = self.records.read().await;

        let mut active: Vec<(usize, &ArModel)> =
            records.iter().enumerate().filter(|(_, r)| r.is_active).collect();
        active.sort_by(|(pa, a), (pb, b)| (b.uploaded_at, pb).cmp(&(a.uploaded_at, pa)));

        let total = active.len() as i64;
        let page = active
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, r)| r.clone())
            .collect();

        Ok((page, total))
    }

    async fn insert(&self, record: NewArModel) -> StoreResult<ArModel> {
        let mut records = self.records.write().await;

        if let Some(field) = Self::duplicate_field(&records, &record) {
            return Err(StoreError::UniqueViolation(field));
        }

        let now = Utc::now();
        let stored = ArModel {
            id: Uuid::new_v4(),
            stored_file_name: record.stored_file_name,
            original_file_name: record.original_file_name,
            file_size_bytes: record.file_size_bytes,
            mime_type: record.mime_type,
            model_url: record.model_url,
            ar_view_url: record.ar_view_url,
            qr_code_url: record.qr_code_url,
            qr_code_data: record.qr_code_data,
            qr_code_id: record.qr_code_id,
            uploaded_at: record.uploaded_at,
            last_accessed_at: record.uploaded_at,
            access_count: 0,
            description: record.description,
            tags: record.tags,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        records.push(stored.clone());

        Ok(stored)
    }

    async fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<ArModel>> {
        let mut records = self.records.write().await;

        Ok(records
            .iter_mut()
            .find(|r| r.id == id && r.is_active)
            .map(|record| {
                record.access_count += 1;
                record.last_accessed_at = at;
                record.updated_at = Utc::now();
                record.clone()
            }))
    }
}
