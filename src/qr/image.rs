//! QR-code rendering and upload.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use rand::distr::{Alphanumeric, SampleString};

use crate::errors::AppError;
use crate::models::fold_name;
use crate::storage::ObjectStoreGateway;

/// Object-store prefix of rendered QR images.
pub const QR_IMAGE_PREFIX: &str = "qr-images";

/// Length of generated URL slugs.
pub const SLUG_LEN: usize = 12;

/// Object key of a QR's image, derived from its name alone.
///
/// Distinct folded names always map to distinct keys.
pub fn qr_image_key(name: &str) -> String {
    format!(
        "{}/{}.png",
        QR_IMAGE_PREFIX,
        escape_key_component(&fold_name(name))
    )
}

/// Reversible key encoding: ASCII alphanumerics, `-` and `.` pass through,
/// every other byte (including `_`) becomes `_xx` in lowercase hex.
fn escape_key_component(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for byte in component.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("_{:02x}", byte)),
        }
    }
    escaped
}

/// URL encoded into the QR code (and used for its link).
pub fn payload_url(qr_url: &str) -> String {
    let qr_url = qr_url.trim();
    if qr_url.starts_with("https://") || qr_url.starts_with("http://") {
        qr_url.to_string()
    } else {
        format!("https://www.{}", qr_url)
    }
}

/// Random lowercase alphanumeric slug for QRs created without a URL.
pub fn generate_slug() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), SLUG_LEN)
        .to_lowercase()
}

/// Renders QR codes as PNGs and stores them through the gateway.
pub struct QrImageGenerator {
    gateway: ObjectStoreGateway,
    size: u32,
}

impl QrImageGenerator {
    pub fn new(gateway: ObjectStoreGateway, size: u32) -> Self {
        Self { gateway, size }
    }

    /// Encode `payload` as a black-on-white PNG. Pure and deterministic.
    pub fn render(&self, payload: &str) -> Result<Vec<u8>, AppError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| {
            AppError::ImageGeneration(format!("Cannot encode QR payload: {}", e))
        })?;

        let bitmap = code
            .render::<Luma<u8>>()
            .dark_color(Luma([0u8]))
            .light_color(Luma([255u8]))
            .quiet_zone(true)
            .min_dimensions(self.size, self.size)
            .build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(bitmap)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| AppError::ImageGeneration(format!("Cannot encode PNG: {}", e)))?;

        Ok(bytes)
    }

    /// Render the QR for `qr_url` and upload it under the key derived from `name`.
    pub async fn generate(&self, name: &str, qr_url: &str) -> Result<String, AppError> {
        let key = qr_image_key(name);
        let bytes = self.render(&payload_url(qr_url))?;

        let outcome = self.gateway.put(&key, bytes, "image/png").await;
        if !outcome.success {
            return Err(AppError::ImageGeneration(format!(
                "Failed to upload QR image {}",
                outcome.key
            )));
        }

        tracing::debug!(key = %outcome.key, "QR image stored");
        Ok(outcome.key)
    }
}
