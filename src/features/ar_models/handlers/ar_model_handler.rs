use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, RequestOrigin};
use crate::features::ar_models::dtos::{
    parse_tags, ArModelResponseDto, ModelUpload, RedirectQuery, ScanMatchDto, ScanRequestDto,
    UploadModelDto, UploadModelResponseDto,
};
use crate::features::ar_models::services::ArModelService;
use crate::modules::qr::PNG_CONTENT_TYPE;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Upload a 3D model
///
/// Accepts multipart/form-data with:
/// - `model`: The .glb or .gltf file (required)
/// - `description`: Optional description
/// - `tags`: Optional comma separated tags
#[utoipa::path(
    post,
    path = "/api/models/upload",
    tag = "models",
    request_body(
        content = UploadModelDto,
        content_type = "multipart/form-data",
        description = "Model upload form with optional description and tags",
    ),
    responses(
        (status = 201, description = "Model uploaded and QR code generated", body = ApiResponse<UploadModelResponseDto>),
        (status = 400, description = "Missing or invalid model file"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Could not allocate a QR code id")
    )
)]
pub async fn upload_model(
    origin: RequestOrigin,
    State(service): State<Arc<ArModelService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadModelResponseDto>>)> {
    let mut model: Option<(Vec<u8>, String, Option<String>)> = None;
    let mut description = String::new();
    let mut tags = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "model" => {
                let content_type = field.content_type().map(|s| s.to_string());
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read model bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read model file: {}", e))
                })?;

                model = Some((data.to_vec(), file_name, content_type));
            }
            "description" => {
                description = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read description field: {}", e))
                })?;
            }
            "tags" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read tags field: {}", e))
                })?;
                tags = parse_tags(&text);
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (data, file_name, content_type) =
        model.ok_or_else(|| AppError::BadRequest("Model file is required".to_string()))?;

    let upload = ModelUpload {
        data,
        file_name,
        content_type,
        description: description.trim().to_string(),
        tags,
    };

    let response = service.upload(upload, &origin).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("Model uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Resolve a scanned or typed code
///
/// Tries the short QR code id, then the full QR payload, then a
/// case-insensitive fragment of the payload. Counts one access on a match.
#[utoipa::path(
    post,
    path = "/api/models/scan",
    tag = "models",
    request_body = ScanRequestDto,
    responses(
        (status = 200, description = "Matching model", body = ApiResponse<ScanMatchDto>),
        (status = 400, description = "Empty or invalid candidate"),
        (status = 404, description = "No active model matches")
    )
)]
pub async fn scan_model(
    State(service): State<Arc<ArModelService>>,
    AppJson(dto): AppJson<ScanRequestDto>,
) -> Result<Json<ApiResponse<ScanMatchDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service.resolve(&dto.candidate).await?;

    Ok(Json(ApiResponse::success(Some(response), None, None)))
}

/// Resolve a code and redirect to its AR viewer
#[utoipa::path(
    get,
    path = "/api/models/scan/redirect",
    tag = "models",
    params(RedirectQuery),
    responses(
        (status = 303, description = "Redirect to the matching AR view URL"),
        (status = 400, description = "Empty code"),
        (status = 404, description = "No active model matches")
    )
)]
pub async fn scan_redirect(
    State(service): State<Arc<ArModelService>>,
    Query(query): Query<RedirectQuery>,
) -> Result<Redirect> {
    let response = service.resolve(&query.code).await?;
    Ok(Redirect::to(&response.ar_view_url))
}

/// List active models (paginated, newest first)
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "models",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of models", body = ApiResponse<Vec<ArModelResponseDto>>)
    )
)]
pub async fn list_models(
    State(service): State<Arc<ArModelService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ArModelResponseDto>>>> {
    let (items, total) = service.list(params.offset(), params.limit()).await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Get a model by ID
#[utoipa::path(
    get,
    path = "/api/models/{id}",
    tag = "models",
    params(
        ("id" = Uuid, Path, description = "Model ID")
    ),
    responses(
        (status = 200, description = "Model found", body = ApiResponse<ArModelResponseDto>),
        (status = 404, description = "Model not found")
    )
)]
pub async fn get_model(
    State(service): State<Arc<ArModelService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ArModelResponseDto>>> {
    let model = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(model), None, None)))
}

/// Get the QR code image of a model
#[utoipa::path(
    get,
    path = "/api/models/{id}/qr.png",
    tag = "models",
    params(
        ("id" = Uuid, Path, description = "Model ID")
    ),
    responses(
        (status = 200, description = "QR code image (image/png)"),
        (status = 404, description = "Model not found")
    )
)]
pub async fn get_model_qr(
    State(service): State<Arc<ArModelService>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let png = service.qr_png(id).await?;
    Ok(([(header::CONTENT_TYPE, PNG_CONTENT_TYPE)], png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ar_models::models::MatchStrategy;
    use crate::features::ar_models::routes;
    use crate::features::ar_models::stores::{ArModelStore, InMemoryArModelStore};
    use crate::modules::storage::LocalAssetStorage;
    use crate::shared::test_helpers::{new_record, FailingStore};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn server() -> (TestServer, Arc<InMemoryArModelStore>, TempDir) {
        let store = Arc::new(InMemoryArModelStore::new());
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalAssetStorage::new(dir.path()).await.unwrap());
        let service = ArModelService::new(store.clone(), storage)
            .with_public_base_url(Some("http://test.local".to_string()));

        let server = TestServer::new(routes(Arc::new(service))).unwrap();
        (server, store, dir)
    }

    fn model_form(file_name: &str) -> MultipartForm {
        MultipartForm::new()
            .add_part(
                "model",
                Part::bytes(b"glTF\x02\x00\x00\x00".to_vec())
                    .file_name(file_name)
                    .mime_type("model/gltf-binary"),
            )
            .add_text("description", "Office chair")
            .add_text("tags", "furniture, chair")
    }

    #[tokio::test]
    async fn test_upload_and_scan() {
        let (server, _store, _dir) = server().await;

        let response = server
            .post("/api/models/upload")
            .multipart(model_form("chair.glb"))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: ApiResponse<UploadModelResponseDto> = response.json();
        let uploaded = body.data.unwrap();
        assert_eq!(uploaded.model.qr_code_data, uploaded.ar_view_url);
        assert_eq!(uploaded.model.description, "Office chair");
        assert_eq!(uploaded.model.tags, vec!["furniture", "chair"]);

        let response = server
            .post("/api/models/scan")
            .json(&serde_json::json!({ "candidate": uploaded.ar_view_url }))
            .await;
        response.assert_status_ok();

        let body: ApiResponse<ScanMatchDto> = response.json();
        let scan = body.data.unwrap();
        assert_eq!(scan.model.id, uploaded.model.id);
        assert_eq!(scan.matched_by, MatchStrategy::QrCodeData);
        assert_eq!(scan.model.access_count, 1);
    }

    #[tokio::test]
    async fn test_upload_requires_model_field() {
        let (server, _store, _dir) = server().await;

        let response = server
            .post("/api/models/upload")
            .multipart(MultipartForm::new().add_text("description", "no file"))
            .await;
        response.assert_status_bad_request();

        let body: ApiResponse<()> = response.json();
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_extension() {
        let (server, _store, dir) = server().await;

        let response = server
            .post("/api/models/upload")
            .multipart(model_form("chair.fbx"))
            .await;
        response.assert_status_bad_request();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_scan_unknown_code_is_not_found() {
        let (server, _store, _dir) = server().await;

        let response = server
            .post("/api/models/scan")
            .json(&serde_json::json!({ "candidate": "FFFFFFFFFFFFFFFF" }))
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_scan_rejects_empty_candidate() {
        let (server, _store, _dir) = server().await;

        let response = server
            .post("/api/models/scan")
            .json(&serde_json::json!({ "candidate": "" }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_scan_redirect_points_at_ar_view() {
        let (server, store, _dir) = server().await;
        let record = store.insert(new_record(1, "0123456789ABCDEF")).await.unwrap();

        let response = server
            .get("/api/models/scan/redirect")
            .add_query_param("code", "0123456789ABCDEF")
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), record.ar_view_url.as_str());
        assert_eq!(store.get(record.id).await.unwrap().access_count, 1);

        let response = server
            .get("/api/models/scan/redirect")
            .add_query_param("code", "nothing-here")
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_list_and_get_model() {
        let (server, store, _dir) = server().await;
        let first = store.insert(new_record(1, "0000000000000001")).await.unwrap();
        store.insert(new_record(2, "0000000000000002")).await.unwrap();

        let response = server
            .get("/api/models")
            .add_query_param("page", 1)
            .add_query_param("page_size", 1)
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<ArModelResponseDto>> = response.json();
        assert_eq!(body.meta.unwrap().total, 2);
        assert_eq!(body.data.unwrap().len(), 1);

        let response = server.get(&format!("/api/models/{}", first.id)).await;
        response.assert_status_ok();
        let body: ApiResponse<ArModelResponseDto> = response.json();
        assert_eq!(body.data.unwrap().access_count, 1);

        let response = server.get(&format!("/api/models/{}", Uuid::new_v4())).await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_get_model_qr_png() {
        let (server, store, _dir) = server().await;
        let record = store.insert(new_record(1, "0000000000000001")).await.unwrap();

        let response = server.get(&format!("/api/models/{}/qr.png", record.id)).await;
        response.assert_status_ok();
        assert_eq!(response.header(header::CONTENT_TYPE), PNG_CONTENT_TYPE);
        assert!(response.as_bytes().starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_list_models_with_huge_page_is_empty() {
        let (server, store, _dir) = server().await;
        store.insert(new_record(1, "0000000000000001")).await.unwrap();

        let response = server
            .get("/api/models")
            .add_query_param("page", i64::MAX)
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<ArModelResponseDto>> = response.json();
        assert_eq!(body.meta.unwrap().total, 1);
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_rejects_nul_candidate() {
        let (server, _store, _dir) = server().await;

        let response = server
            .post("/api/models/scan")
            .json(&serde_json::json!({ "candidate": "ABC\u{0}123" }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalAssetStorage::new(dir.path()).await.unwrap());
        let service = ArModelService::new(Arc::new(FailingStore), storage);
        let server = TestServer::new(routes(Arc::new(service))).unwrap();

        let response = server
            .post("/api/models/scan")
            .json(&serde_json::json!({ "candidate": "0000000000000001" }))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        server
            .get("/api/models")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
