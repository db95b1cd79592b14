use utoipa::{Modify, OpenApi};

use crate::features::ar_models::{dtos as ar_models_dtos, handlers as ar_models_handlers};
use crate::features::ar_models::models::MatchStrategy;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Models
        ar_models_handlers::upload_model,
        ar_models_handlers::scan_model,
        ar_models_handlers::scan_redirect,
        ar_models_handlers::list_models,
        ar_models_handlers::get_model,
        ar_models_handlers::get_model_qr,
    ),
    components(
        schemas(
            Meta,
            ApiResponse<ar_models_dtos::UploadModelResponseDto>,
            ApiResponse<ar_models_dtos::ScanMatchDto>,
            ApiResponse<ar_models_dtos::ArModelResponseDto>,
            ApiResponse<Vec<ar_models_dtos::ArModelResponseDto>>,
            ar_models_dtos::UploadModelDto,
            ar_models_dtos::UploadModelResponseDto,
            ar_models_dtos::ArModelResponseDto,
            ar_models_dtos::QrCodeDto,
            ar_models_dtos::ScanRequestDto,
            ar_models_dtos::ScanMatchDto,
            MatchStrategy,
        )
    ),
    tags(
        (name = "models", description = "3D model upload, QR codes and scan resolution"),
    ),
    info(
        title = "AR QR API",
        version = "0.1.0",
        description = "API documentation for the AR model QR service",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_model_routes() {
        let openapi = ApiDoc::openapi();
        let paths: Vec<&String> = openapi.paths.paths.keys().collect();

        for path in [
            "/api/models/upload",
            "/api/models/scan",
            "/api/models/scan/redirect",
            "/api/models",
            "/api/models/{id}",
            "/api/models/{id}/qr.png",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == path),
                "missing path {}",
                path
            );
        }
    }

    #[test]
    fn test_swagger_info_modifier() {
        let mut openapi = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "Desc".to_string(),
        }
        .modify(&mut openapi);

        assert_eq!(openapi.info.title, "Custom");
        assert_eq!(openapi.info.version, "9.9.9");
    }
}
