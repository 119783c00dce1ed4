//! Saga coordinator for QR create, update and delete.
//!
//! Each public operation runs its steps through a [`Saga`]. Steps that fail
//! before anything was written return straight away; later failures unwind
//! the recorded compensations and then return the original error.

use std::sync::Arc;

use chrono::Utc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{DeleteQrResponse, NewQr, Qr, QrChanges, QrView, UploadedFile};
use crate::storage::ObjectStoreGateway;

use super::children::ContentDispatcher;
use super::content::ContentResolver;
use super::image::{generate_slug, QrImageGenerator};
use super::resolver::ReferenceResolver;
use super::saga::{Compensation, Compensator, Saga, SagaState};

/// Coordinates every write that touches a QR.
pub struct QrOrchestrator {
    repo: Arc<Repository>,
    gateway: ObjectStoreGateway,
    resolver: ReferenceResolver,
    images: Arc<QrImageGenerator>,
    dispatcher: Arc<ContentDispatcher>,
    content: Arc<ContentResolver>,
    compensator: Compensator,
}

impl QrOrchestrator {
    /// Wire up the orchestrator and its collaborators around shared clients.
    pub fn new(repo: Arc<Repository>, gateway: ObjectStoreGateway, qr_image_size: u32) -> Self {
        let images = Arc::new(QrImageGenerator::new(gateway.clone(), qr_image_size));
        let dispatcher = Arc::new(ContentDispatcher::new(repo.clone(), gateway.clone()));
        let content = Arc::new(ContentResolver::new(
            repo.clone(),
            gateway.clone(),
            dispatcher.clone(),
        ));
        let compensator = Compensator::new(repo.clone(), gateway.clone(), images.clone());

        Self {
            resolver: ReferenceResolver::new(repo.clone()),
            repo,
            gateway,
            images,
            dispatcher,
            content,
            compensator,
        }
    }

    /// The read side sharing this orchestrator's clients.
    pub fn content(&self) -> Arc<ContentResolver> {
        self.content.clone()
    }

    // ==================== CREATE ====================

    /// Create a QR, its image and its children, or nothing at all.
    pub async fn create(&self, input: NewQr, files: Vec<UploadedFile>) -> Result<QrView, AppError> {
        let mut saga = Saga::begin("create", &input.name);

        match self.run_create(&mut saga, input, files).await {
            Ok(view) => {
                saga.commit();
                Ok(view)
            }
            Err(e) => Err(saga.fail(&self.compensator, e).await),
        }
    }

    async fn run_create(
        &self,
        saga: &mut Saga,
        input: NewQr,
        files: Vec<UploadedFile>,
    ) -> Result<QrView, AppError> {
        if self.repo.qr_name_taken(&input.name, None).await? {
            return Err(AppError::Conflict(format!(
                "A QR named {} already exists",
                input.name
            )));
        }

        saga.advance(SagaState::ResolvingRefs);
        let (location, category) = self
            .resolver
            .resolve(&input.location_id, &input.category_id)
            .await?;
        let kind = category.kind();
        if kind.takes_files() && files.is_empty() {
            return Err(AppError::validation(format!(
                "category {} requires at least one file",
                category.name
            )));
        }

        saga.advance(SagaState::Persisting);
        let now = Utc::now().to_rfc3339();
        let mut qr = Qr {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            qr_url: input.qr_url.unwrap_or_else(generate_slug),
            active: true,
            created_at: now.clone(),
            modified_at: now,
            location_id: location.id.clone(),
            category_id: category.id.clone(),
            qr_image_reference: String::new(),
        };
        self.repo.insert_qr(&qr).await?;
        saga.record(Compensation::DeleteQr(qr.id.clone()));

        saga.advance(SagaState::ImageGenerating);
        let key = self.images.generate(&qr.name, &qr.qr_url).await?;
        saga.record(Compensation::DeleteObject(key.clone()));
        self.repo
            .set_qr_image_reference(&qr.id, &key)
            .await
            .map_err(|e| {
                AppError::ImageGeneration(format!("Failed to record QR image: {}", e.message()))
            })?;
        qr.qr_image_reference = key;

        saga.advance(SagaState::ChildCreating);
        self.dispatcher
            .dispatch(&qr, kind, files, saga.undo_log())
            .await?;

        tracing::info!(id = %qr.id, name = %qr.name, kind = kind.as_str(), "QR created");
        self.content.view(&qr, &location, &category).await
    }

    // ==================== UPDATE ====================

    /// Apply a partial update to the QR found by `term`.
    pub async fn update(
        &self,
        term: &str,
        changes: QrChanges,
        files: Vec<UploadedFile>,
    ) -> Result<QrView, AppError> {
        let mut saga = Saga::begin("update", term);

        match self.run_update(&mut saga, term, changes, files).await {
            Ok((view, stale_key)) => {
                saga.commit();
                if let Some(key) = stale_key {
                    self.gateway.delete(&key).await;
                }
                Ok(view)
            }
            Err(e) => Err(saga.fail(&self.compensator, e).await),
        }
    }

    /// Returns the new view and the image key the QR no longer uses, if any.
    async fn run_update(
        &self,
        saga: &mut Saga,
        term: &str,
        changes: QrChanges,
        files: Vec<UploadedFile>,
    ) -> Result<(QrView, Option<String>), AppError> {
        let existing = self
            .repo
            .find_qr(term)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QR {} not found", term.trim())))?;

        if let Some(name) = &changes.name {
            if *name != existing.name && self.repo.qr_name_taken(name, Some(&existing.id)).await? {
                return Err(AppError::Conflict(format!("A QR named {} already exists", name)));
            }
        }

        saga.advance(SagaState::ResolvingRefs);
        let current_category = self.repo.get_category(&existing.category_id).await?.ok_or_else(|| {
            AppError::ReferenceNotFound(format!("Category {} not found", existing.category_id))
        })?;
        let (location, category) = self
            .resolver
            .resolve(
                changes.location_id.as_deref().unwrap_or(&existing.location_id),
                changes.category_id.as_deref().unwrap_or(&existing.category_id),
            )
            .await?;

        let kind = category.kind();
        if kind != current_category.kind() {
            return Err(AppError::validation(format!(
                "category must hold {} like {}",
                current_category.kind().as_str(),
                current_category.name
            )));
        }
        if !files.is_empty() && !kind.takes_files() {
            return Err(AppError::validation(format!(
                "category {} does not accept files",
                category.name
            )));
        }

        saga.advance(SagaState::Persisting);
        let mut updated = Qr {
            name: changes.name.unwrap_or_else(|| existing.name.clone()),
            qr_url: changes.qr_url.unwrap_or_else(|| existing.qr_url.clone()),
            active: changes.active.unwrap_or(existing.active),
            modified_at: Utc::now().to_rfc3339(),
            location_id: location.id.clone(),
            category_id: category.id.clone(),
            ..existing.clone()
        };
        self.repo.write_qr(&updated).await?;
        saga.record(Compensation::RestoreQr(Box::new(existing.clone())));

        let name_changed = updated.name != existing.name;
        let url_changed = updated.qr_url != existing.qr_url;
        let mut stale_key = None;

        if name_changed || url_changed || existing.qr_image_reference.is_empty() {
            saga.advance(SagaState::ImageGenerating);
            let key = self.images.generate(&updated.name, &updated.qr_url).await?;

            if key == existing.qr_image_reference {
                // Overwritten in place; undo renders the old payload again.
                saga.record(Compensation::RenderQrImage {
                    name: existing.name.clone(),
                    qr_url: existing.qr_url.clone(),
                });
            } else {
                saga.record(Compensation::DeleteObject(key.clone()));
                if !existing.qr_image_reference.is_empty() {
                    stale_key = Some(existing.qr_image_reference.clone());
                }
            }

            if key != updated.qr_image_reference {
                self.repo.set_qr_image_reference(&updated.id, &key).await?;
                updated.qr_image_reference = key;
            }
        }

        saga.advance(SagaState::ChildCreating);
        if !kind.takes_files() || !files.is_empty() {
            self.dispatcher
                .refresh(&updated, kind, files, saga.undo_log())
                .await?;
        }

        tracing::info!(id = %updated.id, name = %updated.name, "QR updated");
        let view = self.content.view(&updated, &location, &category).await?;
        Ok((view, stale_key))
    }

    // ==================== DELETE ====================

    /// Delete a QR, its children and their objects.
    ///
    /// Nothing here is undone: once a child is gone the QR is going too.
    pub async fn remove(&self, id: &str) -> Result<DeleteQrResponse, AppError> {
        let mut saga = Saga::begin("delete", id);

        match self.run_remove(&mut saga, id).await {
            Ok(response) => {
                saga.commit();
                Ok(response)
            }
            Err(e) => Err(saga.fail(&self.compensator, e).await),
        }
    }

    async fn run_remove(&self, saga: &mut Saga, id: &str) -> Result<DeleteQrResponse, AppError> {
        let qr = self
            .repo
            .get_qr(id.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QR {} not found", id.trim())))?;

        saga.advance(SagaState::ResolvingRefs);
        let kind = self
            .repo
            .get_category(&qr.category_id)
            .await?
            .map(|category| category.kind());

        let (links, images, documents) = self.repo.child_counts(&qr.id).await?;
        tracing::debug!(id = %qr.id, links, images, documents, "Removing QR children");

        saga.advance(SagaState::Persisting);
        let removed_children = match kind {
            Some(kind) => self.dispatcher.remove(&qr.id, kind).await?,
            None => {
                tracing::warn!(id = %qr.id, "QR category is gone, purging rows only");
                0
            }
        };
        self.repo.purge_qr(&qr.id).await?;
        self.gateway.delete(&qr.qr_image_reference).await;

        tracing::info!(id = %qr.id, name = %qr.name, removed_children, "QR deleted");
        Ok(DeleteQrResponse {
            msg: format!("QR {} deleted", qr.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChildView, ContentKind, CreateCategoryRequest, CreateLocationRequest,
    };
    use crate::storage::{ObjectStore, StorageError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store that can be told to fail puts.
    #[derive(Default)]
    struct RecordingStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        fail_prefix: Mutex<Option<String>>,
        /// Fail the n-th media upload (1-based), counting from when it was set
        fail_media_put: Mutex<Option<usize>>,
        media_puts: Mutex<usize>,
    }

    impl RecordingStore {
        fn fail_puts_under(&self, prefix: &str) {
            *self.fail_prefix.lock().unwrap() = Some(prefix.to_string());
        }

        fn fail_nth_media_put(&self, n: usize) {
            *self.media_puts.lock().unwrap() = 0;
            *self.fail_media_put.lock().unwrap() = Some(n);
        }

        fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(&self, key: &str, bytes: Vec<u8>, _: &str) -> Result<(), StorageError> {
            if let Some(prefix) = self.fail_prefix.lock().unwrap().as_deref() {
                if key.starts_with(prefix) {
                    return Err(StorageError::Backend("simulated outage".into()));
                }
            }
            if key.starts_with("media/") {
                let mut count = self.media_puts.lock().unwrap();
                *count += 1;
                if *self.fail_media_put.lock().unwrap() == Some(*count) {
                    return Err(StorageError::Backend("simulated outage".into()));
                }
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        fn object_url(&self, key: &str) -> String {
            format!("http://objects.test/{}", key)
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        repo: Arc<Repository>,
        store: Arc<RecordingStore>,
        orchestrator: QrOrchestrator,
    }

    impl Fixture {
        async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let pool = crate::db::init_database(&temp_dir.path().join("qrs.sqlite"))
                .await
                .unwrap();
            let repo = Arc::new(Repository::new(pool));
            let store = Arc::new(RecordingStore::default());
            let gateway = ObjectStoreGateway::new(store.clone());
            let orchestrator = QrOrchestrator::new(repo.clone(), gateway, 100);

            Self {
                _temp_dir: temp_dir,
                repo,
                store,
                orchestrator,
            }
        }

        async fn location(&self, number: i64, name: &str) -> String {
            self.repo
                .create_location(&CreateLocationRequest {
                    location_number: number,
                    name: name.to_string(),
                    active: true,
                })
                .await
                .unwrap()
                .id
        }

        async fn category(&self, name: &str, category_type: &str) -> String {
            self.repo
                .create_category(&CreateCategoryRequest {
                    name: name.to_string(),
                    category_type: Some(category_type.to_string()),
                    active: true,
                })
                .await
                .unwrap()
                .id
        }

        fn new_qr(&self, name: &str, location: &str, category: &str) -> NewQr {
            NewQr {
                name: name.to_string(),
                qr_url: None,
                location_id: location.to_string(),
                category_id: category.to_string(),
            }
        }
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: name.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_create_links_qr() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;

        let mut input = fx.new_qr("poolbar", &loc, &cat);
        input.qr_url = Some("abc123".to_string());
        let view = fx.orchestrator.create(input, vec![]).await.unwrap();

        assert_eq!(view.name, "poolbar");
        assert_eq!(view.qr_image_reference, "qr-images/poolbar.png");
        assert_eq!(
            view.qr_data,
            Some(vec![ChildView::Named {
                doc: "poolbar".into(),
                value: "https://www.abc123".into(),
            }])
        );
        assert!(fx.store.get("qr-images/poolbar.png").is_some());

        let (links, images, documents) = fx.repo.child_counts(&view.id).await.unwrap();
        assert_eq!((links, images, documents), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_create_without_url_generates_slug() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;

        let view = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap();
        assert_eq!(view.qr_url.len(), crate::qr::image::SLUG_LEN);
    }

    #[tokio::test]
    async fn test_create_images_in_upload_order_and_delete_cascades() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Lobby").await;
        let cat = fx.category("Gallery", "images").await;

        let view = fx
            .orchestrator
            .create(
                fx.new_qr("gallery", &loc, &cat),
                vec![file("b.png"), file("a.png"), file("c.png")],
            )
            .await
            .unwrap();

        let orders: Vec<i64> = fx
            .repo
            .list_images(&view.id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
        let names: Vec<String> = fx
            .repo
            .list_images(&view.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["b.png", "a.png", "c.png"]);

        fx.orchestrator.remove(&view.id).await.unwrap();
        assert_eq!(fx.repo.child_counts(&view.id).await.unwrap(), (0, 0, 0));
        assert!(!fx.repo.qr_exists(&view.id).await.unwrap());
        assert!(fx.store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_location_persists_nothing() {
        let fx = Fixture::new().await;
        let cat = fx.category("Menus", "links").await;

        let err = fx
            .orchestrator
            .create(
                fx.new_qr("poolbar", &uuid::Uuid::new_v4().to_string(), &cat),
                vec![],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferenceNotFound(_)));
        assert_eq!(fx.repo.count_qrs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_image_upload_failure_removes_qr() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;
        fx.store.fail_puts_under("qr-images/");

        let before = fx.repo.count_qrs().await.unwrap();
        let err = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ImageGeneration(_)));
        assert_eq!(fx.repo.count_qrs().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_rows_or_objects() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Lobby").await;
        let cat = fx.category("Docs", "documents").await;
        fx.store.fail_nth_media_put(3);

        let err = fx
            .orchestrator
            .create(
                fx.new_qr("handbook", &loc, &cat),
                vec![file("1.pdf"), file("2.pdf"), file("3.pdf")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ChildCreation(_)));
        assert_eq!(fx.repo.count_qrs().await.unwrap(), 0);
        assert!(fx.store.keys().is_empty());
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(fx.repo.pool())
            .await
            .unwrap();
        assert_eq!(documents, 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;

        fx.orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap();
        let err = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(fx.repo.count_qrs().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_media_kind_requires_files() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Lobby").await;
        let cat = fx.category("Gallery", "images").await;

        let err = fx
            .orchestrator
            .create(fx.new_qr("gallery", &loc, &cat), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fx.repo.count_qrs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_appends_images_after_last_order() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Lobby").await;
        let cat = fx.category("Gallery", "images").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("gallery", &loc, &cat), vec![file("a.png"), file("b.png")])
            .await
            .unwrap();

        let updated = fx
            .orchestrator
            .update(&view.id, QrChanges::default(), vec![file("c.png")])
            .await
            .unwrap();

        let orders: Vec<i64> = updated
            .qr_data
            .unwrap()
            .into_iter()
            .filter_map(|child| match child {
                ChildView::Image { order, .. } => Some(order),
                _ => None,
            })
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rename_moves_image_and_relinks_url() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap();

        let changes = QrChanges {
            name: Some("terrace".into()),
            qr_url: Some("https://example.com/terrace".into()),
            ..Default::default()
        };
        let updated = fx.orchestrator.update("poolbar", changes, vec![]).await.unwrap();

        assert_eq!(updated.qr_image_reference, "qr-images/terrace.png");
        assert_eq!(fx.store.keys(), vec!["qr-images/terrace.png".to_string()]);
        let links = fx.repo.list_links(&view.id).await.unwrap();
        assert_eq!(links[0].name, "terrace");
        assert_eq!(links[0].url, "https://example.com/terrace");
    }

    #[tokio::test]
    async fn test_names_differing_only_in_punctuation_keep_their_own_images() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;

        let mut first = fx.new_qr("pool bar", &loc, &cat);
        first.qr_url = Some("first".to_string());
        let first = fx.orchestrator.create(first, vec![]).await.unwrap();
        let first_png = fx.store.get(&first.qr_image_reference).unwrap();

        let mut second = fx.new_qr("pool_bar", &loc, &cat);
        second.qr_url = Some("second".to_string());
        let second = fx.orchestrator.create(second, vec![]).await.unwrap();
        assert_ne!(first.qr_image_reference, second.qr_image_reference);

        fx.orchestrator.remove(&second.id).await.unwrap();

        assert_eq!(fx.store.keys(), vec![first.qr_image_reference.clone()]);
        assert_eq!(fx.store.get(&first.qr_image_reference).unwrap(), first_png);
    }

    #[tokio::test]
    async fn test_search_returns_at_most_twenty() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;

        for i in 1..=21 {
            fx.orchestrator
                .create(fx.new_qr(&format!("bar {:02}", i), &loc, &cat), vec![])
                .await
                .unwrap();
        }
        fx.orchestrator
            .create(fx.new_qr("lobby", &loc, &cat), vec![])
            .await
            .unwrap();

        let found = fx.orchestrator.content().search("BAR").await.unwrap();
        assert_eq!(found.len(), 20);
        assert!(found.iter().all(|qr| qr.name.starts_with("bar ")));
    }

    #[tokio::test]
    async fn test_failed_update_restores_previous_row() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap();
        fx.store.fail_puts_under("qr-images/");

        let changes = QrChanges {
            name: Some("terrace".into()),
            ..Default::default()
        };
        let err = fx.orchestrator.update(&view.id, changes, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::ImageGeneration(_)));

        let qr = fx.repo.get_qr(&view.id).await.unwrap().unwrap();
        assert_eq!(qr.name, "poolbar");
        assert_eq!(qr.qr_image_reference, "qr-images/poolbar.png");
    }

    #[tokio::test]
    async fn test_update_rejects_category_of_other_kind() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let links = fx.category("Menus", "links").await;
        let images = fx.category("Gallery", "images").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &links), vec![])
            .await
            .unwrap();

        let changes = QrChanges {
            category_id: Some(images),
            ..Default::default()
        };
        let err = fx.orchestrator.update(&view.id, changes, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let qr = fx.repo.get_qr(&view.id).await.unwrap().unwrap();
        assert_eq!(qr.category_id, links);
    }

    #[tokio::test]
    async fn test_single_kind_per_qr() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Lobby").await;
        let cat = fx.category("Docs", "documents").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("handbook", &loc, &cat), vec![file("a.pdf")])
            .await
            .unwrap();

        assert_eq!(view.category.category_type, ContentKind::DocumentSet.as_str());
        assert_eq!(fx.repo.child_counts(&view.id).await.unwrap(), (0, 0, 1));
    }

    #[tokio::test]
    async fn test_compensate_removes_qr_and_image() {
        let fx = Fixture::new().await;
        let loc = fx.location(1, "Pool").await;
        let cat = fx.category("Menus", "links").await;
        let view = fx
            .orchestrator
            .create(fx.new_qr("poolbar", &loc, &cat), vec![])
            .await
            .unwrap();

        fx.orchestrator
            .compensator
            .compensate(&view.id, Some(&view.qr_image_reference))
            .await;

        assert!(!fx.repo.qr_exists(&view.id).await.unwrap());
        assert_eq!(fx.repo.child_counts(&view.id).await.unwrap(), (0, 0, 0));
        assert!(fx.store.keys().is_empty());

        // A second run has nothing left to undo and still does not fail.
        fx.orchestrator.compensator.compensate(&view.id, None).await;
    }

    #[tokio::test]
    async fn test_remove_unknown_qr() {
        let fx = Fixture::new().await;
        let err = fx.orchestrator.remove("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
