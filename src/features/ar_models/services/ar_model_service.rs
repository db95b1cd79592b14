use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::RequestOrigin;
use crate::features::ar_models::dtos::{
    mime_type_for_extension, model_extension, ArModelResponseDto, ModelUpload, QrCodeDto,
    ScanMatchDto, UploadModelResponseDto, ALLOWED_EXTENSIONS, MAX_MODEL_FILE_SIZE,
};
use crate::features::ar_models::models::{ArModel, NewArModel};
use crate::features::ar_models::services::{CodeResolver, QrCodeIdIssuer};
use crate::features::ar_models::stores::{ArModelStore, StoreError, UniqueField};
use crate::modules::qr::{png_data_url, QrRenderer, PNG_CONTENT_TYPE};
use crate::modules::storage::AssetStorage;

/// URL path under which the AR viewer's static files are served
pub const AR_VIEWER_ROUTE: &str = "/ar-view";

/// Viewer page that QR codes point at
pub const AR_VIEWER_PAGE: &str = "ar-view.html";

/// Inserts attempted per upload when a freshly issued id loses a race
pub const MAX_INSERT_ATTEMPTS: usize = 3;

/// Minimum width and height of rendered QR images
pub const QR_IMAGE_SIZE_PX: u32 = 400;

/// `{base}/ar-view/ar-view.html?model={model_url}&auto=1`, with the model URL
/// percent-encoded
pub fn build_ar_view_url(base_url: &str, model_url: &str) -> String {
    format!(
        "{}{}/{}?model={}&auto=1",
        base_url.trim_end_matches('/'),
        AR_VIEWER_ROUTE,
        AR_VIEWER_PAGE,
        urlencoding::encode(model_url)
    )
}

/// Service for uploading, scanning and reading AR models
pub struct ArModelService {
    store: Arc<dyn ArModelStore>,
    storage: Arc<dyn AssetStorage>,
    issuer: QrCodeIdIssuer,
    resolver: CodeResolver,
    renderer: QrRenderer,
    public_base_url: Option<String>,
}

impl ArModelService {
    pub fn new(store: Arc<dyn ArModelStore>, storage: Arc<dyn AssetStorage>) -> Self {
        Self {
            issuer: QrCodeIdIssuer::new(store.clone()),
            resolver: CodeResolver::new(store.clone()),
            renderer: QrRenderer::new(QR_IMAGE_SIZE_PX),
            store,
            storage,
            public_base_url: None,
        }
    }

    /// Replace the id issuer, e.g. one with a deterministic generator
    #[cfg(test)]
    pub fn with_issuer(mut self, issuer: QrCodeIdIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    /// Fixed public base URL; when unset it is derived from each request
    pub fn with_public_base_url(mut self, public_base_url: Option<String>) -> Self {
        self.public_base_url = public_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    /// Base URL that generated links start with
    pub fn public_origin(&self, origin: &RequestOrigin) -> String {
        match &self.public_base_url {
            Some(url) => url.clone(),
            None => origin.0.trim_end_matches('/').to_string(),
        }
    }

    /// Store a model file, render its QR code and create the record
    ///
    /// # Arguments
    /// * `upload` - The received file with its description and tags
    /// * `origin` - Origin of the request, used when no public base URL is configured
    ///
    /// # Returns
    /// The new record, its AR-view URL and the rendered QR code
    pub async fn upload(
        &self,
        upload: ModelUpload,
        origin: &RequestOrigin,
    ) -> Result<UploadModelResponseDto> {
        let extension = model_extension(&upload.file_name).ok_or_else(|| {
            AppError::BadRequest(format!(
                "File type of '{}' is not allowed. Allowed extensions: {}",
                upload.file_name,
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        if upload.data.is_empty() {
            return Err(AppError::BadRequest("Model file is empty".to_string()));
        }

        if upload.data.len() > MAX_MODEL_FILE_SIZE {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                MAX_MODEL_FILE_SIZE,
                MAX_MODEL_FILE_SIZE / 1024 / 1024
            )));
        }

        let mime_type = match upload.content_type.as_deref() {
            Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
            _ => mime_type_for_extension(&extension).to_string(),
        };

        let base_url = self.public_origin(origin);
        let asset_id = Uuid::new_v4();
        let model_name = format!("{}.{}", asset_id, extension);
        let qr_name = format!("{}-qr.png", asset_id);
        let file_size_bytes = upload.data.len() as i64;

        let model_url = self
            .storage
            .put(&model_name, upload.data, &mime_type, &base_url)
            .await?;
        debug!("Model asset stored: {}", model_url);

        let new_record = NewArModel {
            stored_file_name: model_name.clone(),
            original_file_name: upload.file_name,
            file_size_bytes,
            mime_type,
            ar_view_url: build_ar_view_url(&base_url, &model_url),
            qr_code_data: String::new(),
            model_url,
            qr_code_url: None,
            qr_code_id: String::new(),
            uploaded_at: Utc::now(),
            description: upload.description,
            tags: upload.tags,
        };

        match self.finish_upload(new_record, &qr_name, &base_url).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.discard_assets(&[&model_name, &qr_name]).await;
                Err(e)
            }
        }
    }

    async fn finish_upload(
        &self,
        mut new_record: NewArModel,
        qr_name: &str,
        base_url: &str,
    ) -> Result<UploadModelResponseDto> {
        new_record.qr_code_data = new_record.ar_view_url.clone();

        let png = self.renderer.render_png(&new_record.qr_code_data)?;
        let data_url = png_data_url(&png);
        let qr_code_url = self
            .storage
            .put(qr_name, png, PNG_CONTENT_TYPE, base_url)
            .await?;
        new_record.qr_code_url = Some(qr_code_url.clone());

        let model = self.insert_with_fresh_id(new_record).await?;

        info!(
            "AR model created: id={}, qr_code_id={}, file={}, size={}",
            model.id, model.qr_code_id, model.original_file_name, model.file_size_bytes
        );

        Ok(UploadModelResponseDto {
            ar_view_url: model.ar_view_url.clone(),
            model: model.into(),
            qr_code: QrCodeDto {
                image_url: qr_code_url,
                data_url,
            },
        })
    }

    /// Issue an id and insert, issuing again when a concurrent upload took it first
    async fn insert_with_fresh_id(&self, new_record: NewArModel) -> Result<ArModel> {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let mut record = new_record.clone();
            record.qr_code_id = self.issuer.issue().await?;

            match self.store.insert(record).await {
                Ok(model) => return Ok(model),
                Err(StoreError::UniqueViolation(UniqueField::QrCodeId)) => {
                    warn!(
                        "QR code id taken concurrently on insert attempt {}/{}, retrying",
                        attempt, MAX_INSERT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::ServiceUnavailable(format!(
            "QR code id still taken after {} insert attempts",
            MAX_INSERT_ATTEMPTS
        )))
    }

    async fn discard_assets(&self, names: &[&str]) {
        for name in names {
            if let Err(e) = self.storage.delete(name).await {
                warn!("Failed to remove asset {} after failed upload: {}", name, e);
            }
        }
    }

    /// Resolve a scanned or typed code and count the access
    pub async fn resolve(&self, candidate: &str) -> Result<ScanMatchDto> {
        let resolution = self
            .resolver
            .resolve(candidate)
            .await?
            .ok_or_else(|| AppError::NotFound("No model matches this code".to_string()))?;

        Ok(ScanMatchDto {
            ar_view_url: resolution.record.ar_view_url.clone(),
            model: resolution.record.into(),
            matched_by: resolution.strategy,
        })
    }

    /// Get an active model by id, counting the access
    pub async fn get_by_id(&self, id: Uuid) -> Result<ArModelResponseDto> {
        let not_found = || AppError::NotFound(format!("Model with id {} not found", id));

        let model = self
            .store
            .find_active_by_id(id)
            .await?
            .ok_or_else(not_found)?;

        let model = self
            .store
            .record_access(model.id, Utc::now())
            .await?
            .ok_or_else(not_found)?;

        Ok(model.into())
    }

    /// List active models, newest first
    pub async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<ArModelResponseDto>, i64)> {
        let (models, total) = self.store.list_active(offset, limit).await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    /// Render the QR code of an active model as PNG
    pub async fn qr_png(&self, id: Uuid) -> Result<Vec<u8>> {
        let model = self
            .store
            .find_active_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Model with id {} not found", id)))?;

        Ok(self.renderer.render_png(&model.qr_code_data)?)
    }
}
