use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::ar_models::dtos::MAX_MODEL_FILE_SIZE;
use crate::features::ar_models::handlers::{
    get_model, get_model_qr, list_models, scan_model, scan_redirect, upload_model,
};
use crate::features::ar_models::services::ArModelService;

/// Create routes for the AR models feature
pub fn routes(service: Arc<ArModelService>) -> Router {
    Router::new()
        .route(
            "/api/models/upload",
            // Allow body size up to MAX_MODEL_FILE_SIZE + buffer for multipart overhead
            post(upload_model).layer(DefaultBodyLimit::max(MAX_MODEL_FILE_SIZE + 1024 * 1024)),
        )
        .route("/api/models/scan", post(scan_model))
        .route("/api/models/scan/redirect", get(scan_redirect))
        .route("/api/models", get(list_models))
        .route("/api/models/{id}", get(get_model))
        .route("/api/models/{id}/qr.png", get(get_model_qr))
        .with_state(service)
}
