use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::error::AppError;
use crate::features::ar_models::models::{ArModel, MatchStrategy};
use crate::features::ar_models::stores::{ArModelStore, StoreError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid scan candidate: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidInput(msg) => AppError::Validation(msg),
            ResolveError::Store(e) => e.into(),
        }
    }
}

/// A record matched by a scan, after its access has been counted
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: ArModel,
    pub strategy: MatchStrategy,
}

/// Maps a scanned or typed string back to an active model record.
///
/// Strategies are tried in order and the first hit wins:
/// 1. exact `qr_code_id`
/// 2. exact `qr_code_data`
/// 3. `qr_code_data` containing the candidate, ignoring case
///
/// The third strategy tolerates decorated URLs at the cost of false
/// positives on short candidates. Among several partial matches the most
/// recently uploaded record wins.
pub struct CodeResolver {
    store: Arc<dyn ArModelStore>,
}

impl CodeResolver {
    pub fn new(store: Arc<dyn ArModelStore>) -> Self {
        Self { store }
    }

    /// Find the matching record without touching its access counters
    pub async fn find_match(
        &self,
        candidate: &str,
    ) -> Result<Option<(ArModel, MatchStrategy)>, ResolveError> {
        if candidate.trim().is_empty() {
            return Err(ResolveError::InvalidInput(
                "Scanned code must not be empty".to_string(),
            ));
        }
        // Postgres text columns cannot hold NUL
        if candidate.contains('\0') {
            return Err(ResolveError::InvalidInput(
                "Scanned code must not contain NUL characters".to_string(),
            ));
        }

        if let Some(record) = self.store.find_active_by_qr_code_id(candidate).await? {
            return Ok(Some((record, MatchStrategy::QrCodeId)));
        }
        debug!("No record with qr_code_id equal to candidate");

        if let Some(record) = self.store.find_active_by_qr_code_data(candidate).await? {
            return Ok(Some((record, MatchStrategy::QrCodeData)));
        }
        debug!("No record with qr_code_data equal to candidate");

        if let Some(record) = self
            .store
            .find_active_by_qr_code_data_fragment(candidate)
            .await?
        {
            return Ok(Some((record, MatchStrategy::PartialQrCodeData)));
        }
        debug!("No record with qr_code_data containing candidate");

        Ok(None)
    }

    /// Resolve `candidate` and count the access on the matched record.
    ///
    /// `Ok(None)` is the normal "no match" outcome and has no side effects.
    pub async fn resolve(&self, candidate: &str) -> Result<Option<Resolution>, ResolveError> {
        let Some((matched, strategy)) = self.find_match(candidate).await? else {
            return Ok(None);
        };

        // The record may have been deactivated since it matched
        let Some(record) = self.store.record_access(matched.id, Utc::now()).await? else {
            return Ok(None);
        };

        info!(
            "Scan resolved: id={}, qr_code_id={}, strategy={}, access_count={}",
            record.id, record.qr_code_id, strategy, record.access_count
        );

        Ok(Some(Resolution { record, strategy }))
    }
}
