//! Child content owned by a QR: links, images and documents.

use serde::{Deserialize, Serialize};

/// The single link of a links-type QR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
    pub qr_id: String,
}

/// One image of an images-type QR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub name: String,
    /// Object-store key
    pub image_reference: String,
    pub order: i64,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
    pub qr_id: String,
}

/// One document of a documents-type QR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Object-store key
    pub document_reference: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
    pub qr_id: String,
}

/// Read-side projection of a child, as embedded in `qrData`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChildView {
    Image { value: String, order: i64 },
    Named { doc: String, value: String },
}

/// A file received with a create or update request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Content type from the request, or guessed from the file extension.
    pub fn resolved_content_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .to_string()
        })
    }
}
