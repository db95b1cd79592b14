use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Database model for an uploaded 3D model and its QR code identity
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ArModel {
    pub id: Uuid,
    pub stored_file_name: String,
    pub original_file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub model_url: String,
    pub ar_view_url: String,
    pub qr_code_url: Option<String>,
    /// Exact string encoded into the QR image
    pub qr_code_data: String,
    /// Short code, 16 uppercase hex characters
    pub qr_code_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written when a record is created
#[derive(Debug, Clone)]
pub struct NewArModel {
    pub stored_file_name: String,
    pub original_file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub model_url: String,
    pub ar_view_url: String,
    pub qr_code_url: Option<String>,
    pub qr_code_data: String,
    pub qr_code_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub description: String,
    pub tags: Vec<String>,
}

/// Which lookup matched a scanned candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Candidate equals the record's short QR code id
    QrCodeId,
    /// Candidate equals the full encoded QR data
    QrCodeData,
    /// Candidate occurs inside the encoded QR data, ignoring case
    PartialQrCodeData,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::QrCodeId => "qr_code_id",
            MatchStrategy::QrCodeData => "qr_code_data",
            MatchStrategy::PartialQrCodeData => "partial_qr_code_data",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
