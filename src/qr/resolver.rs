//! Reference resolution for a QR's location and category.

use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Category, Location};

/// Loads the location and category a QR points at. Read-only.
#[derive(Clone)]
pub struct ReferenceResolver {
    repo: Arc<Repository>,
}

impl ReferenceResolver {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Both references, or `ReferenceNotFound` naming the first one missing.
    pub async fn resolve(
        &self,
        location_id: &str,
        category_id: &str,
    ) -> Result<(Location, Category), AppError> {
        let location = self.repo.get_location(location_id).await?.ok_or_else(|| {
            AppError::ReferenceNotFound(format!("Location {} not found", location_id))
        })?;

        let category = self.repo.get_category(category_id).await?.ok_or_else(|| {
            AppError::ReferenceNotFound(format!("Category {} not found", category_id))
        })?;

        Ok((location, category))
    }
}
