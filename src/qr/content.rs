//! Read side: reassembles QR views with their polymorphic children.

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Category, ChildView, ContentKind, Location, Qr, QrView};
use crate::storage::ObjectStoreGateway;

use super::children::ContentDispatcher;

/// Maximum number of QRs returned by a search.
pub const SEARCH_LIMIT: i64 = 20;

pub struct ContentResolver {
    repo: Arc<Repository>,
    gateway: ObjectStoreGateway,
    dispatcher: Arc<ContentDispatcher>,
}

impl ContentResolver {
    pub fn new(
        repo: Arc<Repository>,
        gateway: ObjectStoreGateway,
        dispatcher: Arc<ContentDispatcher>,
    ) -> Self {
        Self {
            repo,
            gateway,
            dispatcher,
        }
    }

    /// Children of a QR for the given kind.
    pub async fn resolve_children(
        &self,
        qr_id: &str,
        kind: ContentKind,
    ) -> Result<Vec<ChildView>, AppError> {
        self.dispatcher.children(qr_id, kind).await
    }

    /// Build the view of a QR whose references are already loaded.
    pub async fn view(
        &self,
        qr: &Qr,
        location: &Location,
        category: &Category,
    ) -> Result<QrView, AppError> {
        let children = self.resolve_children(&qr.id, category.kind()).await?;

        Ok(QrView {
            id: qr.id.clone(),
            name: qr.name.clone(),
            qr_url: qr.qr_url.clone(),
            active: qr.active,
            created_at: qr.created_at.clone(),
            modified_at: qr.modified_at.clone(),
            qr_image_reference: qr.qr_image_reference.clone(),
            qr_image_url: self.gateway.object_url(&qr.qr_image_reference),
            location: location.into(),
            category: category.into(),
            qr_data: Some(children),
        })
    }

    /// Load a QR's references and build its view.
    pub async fn view_of(&self, qr: &Qr) -> Result<QrView, AppError> {
        let location = self.repo.get_location(&qr.location_id).await?.ok_or_else(|| {
            AppError::ReferenceNotFound(format!("Location {} not found", qr.location_id))
        })?;
        let category = self.repo.get_category(&qr.category_id).await?.ok_or_else(|| {
            AppError::ReferenceNotFound(format!("Category {} not found", qr.category_id))
        })?;

        self.view(qr, &location, &category).await
    }

    /// One QR by id, name or URL slug.
    pub async fn find_one(&self, term: &str) -> Result<QrView, AppError> {
        let qr = self
            .repo
            .find_qr(term)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QR {} not found", term.trim())))?;

        self.view_of(&qr).await
    }

    /// Case-insensitive substring search on QR names.
    pub async fn search(&self, term: &str) -> Result<Vec<QrView>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::validation("search term is required"));
        }

        let qrs = self.repo.search_qrs(term, SEARCH_LIMIT).await?;
        if qrs.is_empty() {
            return Err(AppError::NotFound(format!("No QR matches {}", term)));
        }

        self.views(qrs).await
    }

    /// QRs whose location and category names contain the given fragments.
    ///
    /// A fragment that matches nothing yields an empty list rather than
    /// dropping the constraint.
    pub async fn filter(
        &self,
        location: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<QrView>, AppError> {
        let location = location.map(str::trim).filter(|s| !s.is_empty());
        let category = category.map(str::trim).filter(|s| !s.is_empty());

        let location_ids = match location {
            Some(fragment) => {
                let ids = self.repo.location_ids_matching(fragment).await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                Some(ids)
            }
            None => None,
        };

        let category_ids = match category {
            Some(fragment) => {
                let ids = self.repo.category_ids_matching(fragment).await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                Some(ids)
            }
            None => None,
        };

        let qrs = self
            .repo
            .list_qrs_in(location_ids.as_deref(), category_ids.as_deref())
            .await?;

        self.views(qrs).await
    }

    /// Views for many QRs, loading every location and category once.
    async fn views(&self, qrs: Vec<Qr>) -> Result<Vec<QrView>, AppError> {
        if qrs.is_empty() {
            return Ok(Vec::new());
        }

        let locations: HashMap<String, Location> = self
            .repo
            .list_locations()
            .await?
            .into_iter()
            .map(|l| (l.id.clone(), l))
            .collect();
        let categories: HashMap<String, Category> = self
            .repo
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut views = Vec::with_capacity(qrs.len());
        for qr in &qrs {
            let (Some(location), Some(category)) = (
                locations.get(&qr.location_id),
                categories.get(&qr.category_id),
            ) else {
                tracing::warn!(qr = %qr.id, "Skipping QR with dangling reference");
                continue;
            };
            views.push(self.view(qr, location, category).await?);
        }

        Ok(views)
    }
}
