use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::ar_models::models::{ArModel, MatchStrategy};

/// Upload model request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadModelDto {
    /// The .glb or .gltf file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub model: String,
    /// Optional free-text description
    #[schema(example = "Red office chair")]
    pub description: Option<String>,
    /// Optional comma separated tags
    #[schema(example = "furniture,chair")]
    pub tags: Option<String>,
}

/// A model file received from a client, before validation
#[derive(Debug, Clone)]
pub struct ModelUpload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
}

/// Response DTO for a stored model record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArModelResponseDto {
    pub id: Uuid,
    pub original_file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    /// Public URL of the model asset
    pub model_url: String,
    /// AR viewer page for this model
    pub ar_view_url: String,
    /// Public URL of the stored QR image
    pub qr_code_url: Option<String>,
    /// Exact string encoded in the QR image
    pub qr_code_data: String,
    /// Short code that can be typed instead of scanning
    #[schema(example = "9F86D081884C7D65")]
    pub qr_code_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: i64,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<ArModel> for ArModelResponseDto {
    fn from(model: ArModel) -> Self {
        Self {
            id: model.id,
            original_file_name: model.original_file_name,
            file_size_bytes: model.file_size_bytes,
            mime_type: model.mime_type,
            model_url: model.model_url,
            ar_view_url: model.ar_view_url,
            qr_code_url: model.qr_code_url,
            qr_code_data: model.qr_code_data,
            qr_code_id: model.qr_code_id,
            uploaded_at: model.uploaded_at,
            last_accessed_at: model.last_accessed_at,
            access_count: model.access_count,
            description: model.description,
            tags: model.tags,
        }
    }
}

/// Rendered QR code for a freshly uploaded model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrCodeDto {
    /// Public URL of the stored PNG
    pub image_url: String,
    /// The same PNG inlined as a `data:image/png;base64,...` URL
    pub data_url: String,
}

/// Response DTO for a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadModelResponseDto {
    pub model: ArModelResponseDto,
    pub ar_view_url: String,
    pub qr_code: QrCodeDto,
}

/// Request DTO for resolving a scanned or typed code
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanRequestDto {
    /// Short code, full QR payload, or a fragment of the payload
    #[validate(length(min = 1, max = 4096, message = "candidate must be 1-4096 characters"))]
    #[schema(example = "9F86D081884C7D65")]
    pub candidate: String,
}

/// Response DTO for a resolved scan
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScanMatchDto {
    pub model: ArModelResponseDto,
    /// Where the client should navigate
    pub ar_view_url: String,
    pub matched_by: MatchStrategy,
}

/// Query parameters for the scan redirect endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct RedirectQuery {
    /// Short code, full QR payload, or a fragment of the payload
    pub code: String,
}

/// Extensions accepted for model uploads
pub const ALLOWED_EXTENSIONS: &[&str] = &["glb", "gltf"];

/// Maximum model file size in bytes (50MB)
pub const MAX_MODEL_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Lowercased extension of `file_name` if it is an accepted model format
pub fn model_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Get MIME type from a model extension
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "gltf" => "model/gltf+json",
        _ => "model/gltf-binary",
    }
}

/// Split a comma separated tag list, dropping blanks
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
