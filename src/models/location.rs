//! Location model.

use serde::{Deserialize, Serialize};

/// A physical place that QRs are posted at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub location_number: i64,
    pub name: String,
    pub active: bool,
    pub created_at: String,
    pub modified_at: String,
}

/// Request body for creating a new location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    pub location_number: i64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl CreateLocationRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.location_number < 1 {
            errors.push("locationNumber must be a positive integer".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn default_active() -> bool {
    true
}
