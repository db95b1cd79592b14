//! QR code rendering
//!
//! Renders the string a QR code should carry into PNG bytes. The bytes are
//! stored next to the model asset and can also be inlined as a `data:` URL
//! that a client displays without another request.

use base64::prelude::*;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

use crate::core::error::AppError;

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum QrRenderError {
    #[error("Data cannot be encoded as a QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Failed to encode PNG: {0}")]
    Png(#[from] image::ImageError),
}

impl From<QrRenderError> for AppError {
    fn from(e: QrRenderError) -> Self {
        AppError::Internal(format!("QR rendering failed: {}", e))
    }
}

/// Renders QR codes with a fixed size and error-correction level
#[derive(Debug, Clone)]
pub struct QrRenderer {
    min_size_px: u32,
    ec_level: EcLevel,
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self {
            min_size_px: 400,
            ec_level: EcLevel::M,
        }
    }
}

impl QrRenderer {
    pub fn new(min_size_px: u32) -> Self {
        Self {
            min_size_px,
            ..Self::default()
        }
    }

    /// Render `data` as a black-on-white PNG with a quiet zone
    pub fn render_png(&self, data: &str) -> Result<Vec<u8>, QrRenderError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), self.ec_level)?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .min_dimensions(self.min_size_px, self.min_size_px)
            .build();

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

/// Inline rendered PNG bytes as a `data:image/png;base64,...` URL
pub fn png_data_url(png: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        PNG_CONTENT_TYPE,
        BASE64_STANDARD.encode(png)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_render_png_produces_png_of_requested_size() {
        let renderer = QrRenderer::default();
        let png = renderer
            .render_png("https://host/ar-view/ar-view.html?model=x&auto=1")
            .unwrap();

        assert!(png.starts_with(PNG_SIGNATURE));

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert!(decoded.width() >= 400);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_render_data_url_prefix() {
        let png = QrRenderer::new(100).render_png("A1B2C3D4E5F6A7B8").unwrap();
        let url = png_data_url(&png);
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_render_rejects_oversized_payload() {
        let data = "x".repeat(8000);
        let result = QrRenderer::default().render_png(&data);
        assert!(matches!(result, Err(QrRenderError::Encode(_))));
    }
}
