//! Category model and the content kind it selects.

use serde::{Deserialize, Serialize};

use super::location::default_active;

/// Which child collection is authoritative for QRs of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Link,
    ImageSet,
    DocumentSet,
}

impl ContentKind {
    /// Interpret a stored `categoryType`. Anything unrecognised means links.
    pub fn from_category_type(category_type: &str) -> Self {
        match category_type.trim().to_ascii_lowercase().as_str() {
            "images" => ContentKind::ImageSet,
            "documents" => ContentKind::DocumentSet,
            _ => ContentKind::Link,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Link => "links",
            ContentKind::ImageSet => "images",
            ContentKind::DocumentSet => "documents",
        }
    }

    /// Whether this kind is built from uploaded files.
    pub fn takes_files(&self) -> bool {
        !matches!(self, ContentKind::Link)
    }
}

/// A category of QRs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub category_type: String,
    pub name: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
}

impl Category {
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_category_type(&self.category_type)
    }
}

/// Request body for creating a new category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub category_type: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        if self.name.trim().is_empty() {
            return Err(vec!["name is required".to_string()]);
        }
        Ok(())
    }

    /// The stored type, normalised to one of the three known values.
    pub fn normalized_type(&self) -> &'static str {
        ContentKind::from_category_type(self.category_type.as_deref().unwrap_or("links")).as_str()
    }
}
