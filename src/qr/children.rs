//! Child content creators and the dispatcher that picks one per content kind.
//!
//! `ContentDispatcher` is the one place that switches on [`ContentKind`], for
//! writes, reads and removal alike.

use std::sync::Arc;

use chrono::Utc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{ChildView, ContentKind, Document, Image, Link, Qr, UploadedFile};
use crate::storage::{sanitize_key_component, ObjectStoreGateway};

use super::image::payload_url;
use super::saga::{Compensation, UndoLog};

/// Object key for an uploaded file. The child id keeps same-named uploads apart.
pub fn media_key(qr_id: &str, child_id: &str, file_name: &str) -> String {
    format!(
        "media/{}/{}/{}",
        qr_id,
        child_id,
        sanitize_key_component(file_name)
    )
}

/// Re-tag any failure while creating children.
fn child_failure(what: &str, err: AppError) -> AppError {
    match err {
        AppError::ChildCreation(_) => err,
        other => AppError::ChildCreation(format!("Failed to create {}: {}", what, other.message())),
    }
}

async fn ensure_qr_exists(repo: &Repository, qr_id: &str, what: &str) -> Result<(), AppError> {
    if repo.qr_exists(qr_id).await? {
        Ok(())
    } else {
        Err(AppError::ChildCreation(format!(
            "Cannot create {} for unknown QR {}",
            what, qr_id
        )))
    }
}

/// Owns the single link of a links-type QR.
pub struct LinkCreator {
    repo: Arc<Repository>,
}

impl LinkCreator {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create the QR's link. A second link for the same QR is rejected.
    pub async fn create(&self, qr: &Qr, undo: &mut UndoLog) -> Result<Link, AppError> {
        ensure_qr_exists(&self.repo, &qr.id, "link").await?;

        if !self.repo.list_links(&qr.id).await?.is_empty() {
            return Err(AppError::ChildCreation(format!(
                "QR {} already has a link",
                qr.name
            )));
        }

        let now = Utc::now().to_rfc3339();
        let link = Link {
            id: uuid::Uuid::new_v4().to_string(),
            name: qr.name.clone(),
            url: payload_url(&qr.qr_url),
            active: true,
            created_at: now.clone(),
            modified_at: now,
            qr_id: qr.id.clone(),
        };

        self.repo
            .insert_link(&link)
            .await
            .map_err(|e| child_failure("link", e))?;
        undo.push(Compensation::DeleteLink(link.id.clone()));

        Ok(link)
    }

    /// Bring the link in line with the QR's current name and URL, creating it if it is missing.
    pub async fn sync(&self, qr: &Qr, undo: &mut UndoLog) -> Result<(), AppError> {
        let Some(existing) = self.repo.list_links(&qr.id).await?.into_iter().next() else {
            self.create(qr, undo).await?;
            return Ok(());
        };

        let url = payload_url(&qr.qr_url);
        if existing.url == url && existing.name == qr.name {
            return Ok(());
        }

        self.repo
            .update_link(&qr.id, &qr.name, &url, &Utc::now().to_rfc3339())
            .await
            .map_err(|e| child_failure("link", e))?;
        undo.push(Compensation::RestoreLink {
            qr_id: qr.id.clone(),
            name: existing.name,
            url: existing.url,
            modified_at: existing.modified_at,
        });
        Ok(())
    }

    pub async fn list(&self, qr_id: &str) -> Result<Vec<ChildView>, AppError> {
        let links = self.repo.list_links(qr_id).await?;
        Ok(links
            .into_iter()
            .map(|link| ChildView::Named {
                doc: link.name,
                value: link.url,
            })
            .collect())
    }

    pub async fn remove_all(&self, qr_id: &str) -> Result<usize, AppError> {
        let links = self.repo.list_links(qr_id).await?;
        for link in &links {
            self.repo.delete_link(&link.id).await?;
        }
        Ok(links.len())
    }
}

/// Owns the ordered images of an images-type QR.
pub struct ImageSetCreator {
    repo: Arc<Repository>,
    gateway: ObjectStoreGateway,
}

impl ImageSetCreator {
    pub fn new(repo: Arc<Repository>, gateway: ObjectStoreGateway) -> Self {
        Self { repo, gateway }
    }

    /// Upload and persist `files` in order, continuing after the QR's last image.
    pub async fn create_batch(
        &self,
        qr: &Qr,
        files: Vec<UploadedFile>,
        undo: &mut UndoLog,
    ) -> Result<Vec<Image>, AppError> {
        ensure_qr_exists(&self.repo, &qr.id, "images").await?;

        let mut next_order = self.repo.max_image_order(&qr.id).await? + 1;
        let mut created = Vec::with_capacity(files.len());

        for file in files {
            let id = uuid::Uuid::new_v4().to_string();
            let key = media_key(&qr.id, &id, &file.file_name);
            let content_type = file.resolved_content_type();

            // Upload first; the row only exists if the bytes landed.
            let outcome = self.gateway.put(&key, file.bytes, &content_type).await;
            if !outcome.success {
                return Err(AppError::ChildCreation(format!(
                    "Failed to upload image {}",
                    file.file_name
                )));
            }
            undo.push(Compensation::DeleteObject(key.clone()));

            let now = Utc::now().to_rfc3339();
            let image = Image {
                id,
                name: file.file_name.trim().to_lowercase(),
                image_reference: key,
                order: next_order,
                active: true,
                created_at: now.clone(),
                modified_at: now,
                qr_id: qr.id.clone(),
            };

            self.repo
                .insert_image(&image)
                .await
                .map_err(|e| child_failure("image", e))?;
            undo.push(Compensation::DeleteImage(image.id.clone()));

            next_order += 1;
            created.push(image);
        }

        Ok(created)
    }

    pub async fn list(&self, qr_id: &str) -> Result<Vec<ChildView>, AppError> {
        let images = self.repo.list_images(qr_id).await?;
        Ok(images
            .into_iter()
            .map(|image| ChildView::Image {
                value: self
                    .gateway
                    .object_url(&image.image_reference)
                    .unwrap_or_default(),
                order: image.order,
            })
            .collect())
    }

    pub async fn remove_all(&self, qr_id: &str) -> Result<usize, AppError> {
        let images = self.repo.list_images(qr_id).await?;
        for image in &images {
            self.repo.delete_image(&image.id).await?;
            self.gateway.delete(&image.image_reference).await;
        }
        Ok(images.len())
    }
}

/// Owns the documents of a documents-type QR.
pub struct DocumentCreator {
    repo: Arc<Repository>,
    gateway: ObjectStoreGateway,
}

impl DocumentCreator {
    pub fn new(repo: Arc<Repository>, gateway: ObjectStoreGateway) -> Self {
        Self { repo, gateway }
    }

    pub async fn create_batch(
        &self,
        qr: &Qr,
        files: Vec<UploadedFile>,
        undo: &mut UndoLog,
    ) -> Result<Vec<Document>, AppError> {
        ensure_qr_exists(&self.repo, &qr.id, "documents").await?;

        let mut created = Vec::with_capacity(files.len());

        for file in files {
            let id = uuid::Uuid::new_v4().to_string();
            let key = media_key(&qr.id, &id, &file.file_name);
            let content_type = file.resolved_content_type();

            let outcome = self.gateway.put(&key, file.bytes, &content_type).await;
            if !outcome.success {
                return Err(AppError::ChildCreation(format!(
                    "Failed to upload document {}",
                    file.file_name
                )));
            }
            undo.push(Compensation::DeleteObject(key.clone()));

            let now = Utc::now().to_rfc3339();
            let document = Document {
                id,
                name: file.file_name.trim().to_string(),
                document_reference: key,
                active: true,
                created_at: now.clone(),
                modified_at: now,
                qr_id: qr.id.clone(),
            };

            self.repo
                .insert_document(&document)
                .await
                .map_err(|e| child_failure("document", e))?;
            undo.push(Compensation::DeleteDocument(document.id.clone()));

            created.push(document);
        }

        Ok(created)
    }

    pub async fn list(&self, qr_id: &str) -> Result<Vec<ChildView>, AppError> {
        let documents = self.repo.list_documents(qr_id).await?;
        Ok(documents
            .into_iter()
            .map(|document| ChildView::Named {
                value: self
                    .gateway
                    .object_url(&document.document_reference)
                    .unwrap_or_default(),
                doc: document.name,
            })
            .collect())
    }

    pub async fn remove_all(&self, qr_id: &str) -> Result<usize, AppError> {
        let documents = self.repo.list_documents(qr_id).await?;
        for document in &documents {
            self.repo.delete_document(&document.id).await?;
            self.gateway.delete(&document.document_reference).await;
        }
        Ok(documents.len())
    }
}

/// Routes child work to the creator matching a category's content kind.
pub struct ContentDispatcher {
    links: LinkCreator,
    images: ImageSetCreator,
    documents: DocumentCreator,
}

impl ContentDispatcher {
    pub fn new(repo: Arc<Repository>, gateway: ObjectStoreGateway) -> Self {
        Self {
            links: LinkCreator::new(repo.clone()),
            images: ImageSetCreator::new(repo.clone(), gateway.clone()),
            documents: DocumentCreator::new(repo, gateway),
        }
    }

    /// Create the initial children of a freshly persisted QR.
    pub async fn dispatch(
        &self,
        qr: &Qr,
        kind: ContentKind,
        files: Vec<UploadedFile>,
        undo: &mut UndoLog,
    ) -> Result<(), AppError> {
        match kind {
            ContentKind::Link => {
                if !files.is_empty() {
                    tracing::warn!(
                        qr = %qr.name,
                        count = files.len(),
                        "Ignoring files sent for a links QR"
                    );
                }
                self.links.create(qr, undo).await?;
            }
            ContentKind::ImageSet => {
                self.images.create_batch(qr, files, undo).await?;
            }
            ContentKind::DocumentSet => {
                self.documents.create_batch(qr, files, undo).await?;
            }
        }
        Ok(())
    }

    /// Bring children in line after an update: relink or append uploads.
    pub async fn refresh(
        &self,
        qr: &Qr,
        kind: ContentKind,
        files: Vec<UploadedFile>,
        undo: &mut UndoLog,
    ) -> Result<(), AppError> {
        match kind {
            ContentKind::Link => self.links.sync(qr, undo).await,
            ContentKind::ImageSet => self.images.create_batch(qr, files, undo).await.map(|_| ()),
            ContentKind::DocumentSet => {
                self.documents.create_batch(qr, files, undo).await.map(|_| ())
            }
        }
    }

    /// Children of a QR as API views.
    pub async fn children(&self, qr_id: &str, kind: ContentKind) -> Result<Vec<ChildView>, AppError> {
        match kind {
            ContentKind::Link => self.links.list(qr_id).await,
            ContentKind::ImageSet => self.images.list(qr_id).await,
            ContentKind::DocumentSet => self.documents.list(qr_id).await,
        }
    }

    /// Delete every child of `kind` for a QR, returning how many rows went.
    pub async fn remove(&self, qr_id: &str, kind: ContentKind) -> Result<usize, AppError> {
        match kind {
            ContentKind::Link => self.links.remove_all(qr_id).await,
            ContentKind::ImageSet => self.images.remove_all(qr_id).await,
            ContentKind::DocumentSet => self.documents.remove_all(qr_id).await,
        }
    }
}
