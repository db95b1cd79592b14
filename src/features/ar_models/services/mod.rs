pub mod ar_model_service;
pub mod code_resolver;
pub mod qr_code_id_issuer;

pub use ar_model_service::ArModelService;
pub use code_resolver::CodeResolver;
pub use qr_code_id_issuer::QrCodeIdIssuer;
