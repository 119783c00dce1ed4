//! QR model, its API view and typed create/update inputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deserialize_opt_bool, fold_name, Category, ChildView, Location};

/// Maximum length of a QR name.
pub const MAX_NAME_LEN: usize = 120;

/// A stored QR record.
#[derive(Debug, Clone, PartialEq)]
pub struct Qr {
    pub id: String,
    pub name: String,
    pub qr_url: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
    pub location_id: String,
    pub category_id: String,
    /// Object-store key of the rendered QR image, empty until uploaded
    pub qr_image_reference: String,
}

/// Location fields embedded in a QR view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub id: String,
    pub location_number: i64,
    pub name: String,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.clone(),
            location_number: location.location_number,
            name: location.name.clone(),
        }
    }
}

/// Category fields embedded in a QR view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: String,
    pub category_type: String,
    pub name: String,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            category_type: category.category_type.clone(),
            name: category.name.clone(),
        }
    }
}

/// Denormalized QR as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrView {
    pub id: String,
    pub name: String,
    pub qr_url: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
    pub qr_image_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image_url: Option<String>,
    pub location: LocationSummary,
    pub category: CategorySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_data: Option<Vec<ChildView>>,
}

/// Confirmation returned after a QR is removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteQrResponse {
    pub msg: String,
}

/// Request body for creating a QR (JSON or multipart text fields).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQrRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qr_url: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQr {
    /// Case-folded name
    pub name: String,
    pub qr_url: Option<String>,
    pub location_id: String,
    pub category_id: String,
}

impl CreateQrRequest {
    /// Check every field and collect all problems at once.
    pub fn validate(&self) -> Result<NewQr, Vec<String>> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        check_id("location", &self.location, &mut errors);
        check_id("category", &self.category, &mut errors);
        let qr_url = self.qr_url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        if let Some(url) = qr_url {
            check_url(url, &mut errors);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewQr {
            name: fold_name(&self.name),
            qr_url: qr_url.map(str::to_string),
            location_id: self.location.trim().to_string(),
            category_id: self.category.trim().to_string(),
        })
    }
}

/// Request body for a partial QR update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQrRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qr_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_bool")]
    pub active: Option<bool>,
}

/// An update request that passed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QrChanges {
    pub name: Option<String>,
    pub qr_url: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub active: Option<bool>,
}

impl UpdateQrRequest {
    pub fn validate(&self) -> Result<QrChanges, Vec<String>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(location) = &self.location {
            check_id("location", location, &mut errors);
        }
        if let Some(category) = &self.category {
            check_id("category", category, &mut errors);
        }
        if let Some(url) = &self.qr_url {
            if url.trim().is_empty() {
                errors.push("qrUrl must not be empty".to_string());
            } else {
                check_url(url.trim(), &mut errors);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(QrChanges {
            name: self.name.as_deref().map(fold_name),
            qr_url: self.qr_url.as_deref().map(|u| u.trim().to_string()),
            location_id: self.location.as_deref().map(|l| l.trim().to_string()),
            category_id: self.category.as_deref().map(|c| c.trim().to_string()),
            active: self.active,
        })
    }
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    let name = name.trim();
    if name.is_empty() {
        errors.push("name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("name must be at most {} characters", MAX_NAME_LEN));
    }
}

fn check_id(field: &str, value: &str, errors: &mut Vec<String>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(format!("{} is required", field));
    } else if Uuid::parse_str(value).is_err() {
        errors.push(format!("{} must be a valid id", field));
    }
}

fn check_url(url: &str, errors: &mut Vec<String>) {
    if url.chars().any(char::is_whitespace) {
        errors.push("qrUrl must not contain whitespace".to_string());
    }
}
