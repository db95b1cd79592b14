use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::features::ar_models::models::{ArModel, NewArModel};
use crate::features::ar_models::stores::{ArModelStore, StoreError, StoreResult};

/// Record whose URLs are unique per `n`
pub fn new_record(n: u32, qr_code_id: &str) -> NewArModel {
    new_record_with_data(n, qr_code_id, None)
}

/// Record with explicit `qr_code_data` (defaults to its AR-view URL)
pub fn new_record_with_data(n: u32, qr_code_id: &str, qr_code_data: Option<&str>) -> NewArModel {
    let model_url = format!("https://host/uploads/model-{}.glb", n);
    let ar_view_url = format!(
        "https://host/ar-view/ar-view.html?model={}&auto=1",
        urlencoding::encode(&model_url)
    );

    NewArModel {
        stored_file_name: format!("model-{}.glb", n),
        original_file_name: format!("model-{}.glb", n),
        file_size_bytes: 2048,
        mime_type: "model/gltf-binary".to_string(),
        qr_code_data: qr_code_data
            .map(str::to_string)
            .unwrap_or_else(|| ar_view_url.clone()),
        model_url,
        ar_view_url,
        qr_code_url: Some(format!("https://host/uploads/model-{}-qr.png", n)),
        qr_code_id: qr_code_id.to_string(),
        uploaded_at: Utc::now(),
        description: String::new(),
        tags: vec![],
    }
}

/// Id generator that yields `ids` in order, then keeps repeating the last one
pub fn id_sequence(ids: &[&str]) -> impl Fn() -> String + Send + Sync + 'static {
    let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let next = std::sync::atomic::AtomicUsize::new(0);

    move || {
        let i = next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        ids[i.min(ids.len() - 1)].clone()
    }
}

/// Store whose every operation fails as if the database were down
pub struct FailingStore;

impl FailingStore {
    fn unavailable<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl ArModelStore for FailingStore {
    async fn qr_code_id_exists(&self, _qr_code_id: &str) -> StoreResult<bool> {
        Self::unavailable()
    }

    async fn find_active_by_qr_code_id(&self, _qr_code_id: &str) -> StoreResult<Option<ArModel>> {
        Self::unavailable()
    }

    async fn find_active_by_qr_code_data(&self, _data: &str) -> StoreResult<Option<ArModel>> {
        Self::unavailable()
    }

    async fn find_active_by_qr_code_data_fragment(
        &self,
        _fragment: &str,
    ) -> StoreResult<Option<ArModel>> {
        Self::unavailable()
    }

    async fn find_active_by_id(&self, _id: Uuid) -> StoreResult<Option<ArModel>> {
        Self::unavailable()
    }

    async fn list_active(&self, _offset: i64, _limit: i64) -> StoreResult<(Vec<ArModel>, i64)> {
        Self::unavailable()
    }

    async fn insert(&self, _record: NewArModel) -> StoreResult<ArModel> {
        Self::unavailable()
    }

    async fn record_access(&self, _id: Uuid, _at: DateTime<Utc>) -> StoreResult<Option<ArModel>> {
        Self::unavailable()
    }
}

/// Store that panics when touched, for paths that must not reach storage
pub struct UntouchableStore;

#[async_trait]
impl ArModelStore for UntouchableStore {
    async fn qr_code_id_exists(&self, _qr_code_id: &str) -> StoreResult<bool> {
        panic!("qr_code_id_exists called")
    }

    async fn find_active_by_qr_code_id(&self, _qr_code_id: &str) -> StoreResult<Option<ArModel>> {
        panic!("find_active_by_qr_code_id called")
    }

    async fn find_active_by_qr_code_data(&self, _data: &str) -> StoreResult<Option<ArModel>> {
        panic!("find_active_by_qr_code_data called")
    }

    async fn find_active_by_qr_code_data_fragment(
        &self,
        _fragment: &str,
    ) -> StoreResult<Option<ArModel>> {
        panic!("find_active_by_qr_code_data_fragment called")
    }

    async fn find_active_by_id(&self, _id: Uuid) -> StoreResult<Option<ArModel>> {
        panic!("find_active_by_id called")
    }

    async fn list_active(&self, _offset: i64, _limit: i64) -> StoreResult<(Vec<ArModel>, i64)> {
        panic!("list_active called")
    }

    async fn insert(&self, _record: NewArModel) -> StoreResult<ArModel> {
        panic!("insert called")
    }

    async fn record_access(&self, _id: Uuid, _at: DateTime<Utc>) -> StoreResult<Option<ArModel>> {
        panic!("record_access called")
    }
}
