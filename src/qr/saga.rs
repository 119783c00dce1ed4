//! Forward-then-compensate execution for multi-resource QR writes.
//!
//! A [`Saga`] walks the orchestrator's state machine. Every step that leaves
//! something behind records a [`Compensation`] only after it succeeded; on
//! failure the [`Compensator`] unwinds them newest first.

use std::fmt;
use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Qr;
use crate::storage::ObjectStoreGateway;

use super::image::QrImageGenerator;

/// Orchestrator states. `RollingBack` and `Failed` are reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    Validating,
    ResolvingRefs,
    Persisting,
    ImageGenerating,
    ChildCreating,
    Committed,
    RollingBack,
    Failed,
}

impl SagaState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Committed | SagaState::Failed)
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaState::Validating => "validating",
            SagaState::ResolvingRefs => "resolving_refs",
            SagaState::Persisting => "persisting",
            SagaState::ImageGenerating => "image_generating",
            SagaState::ChildCreating => "child_creating",
            SagaState::Committed => "committed",
            SagaState::RollingBack => "rolling_back",
            SagaState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An undo action for one completed step.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Remove a QR row together with any child rows still pointing at it
    DeleteQr(String),
    /// Put a QR row back the way it was before an update
    RestoreQr(Box<Qr>),
    /// Re-render a QR image that an update overwrote in place
    RenderQrImage { name: String, qr_url: String },
    DeleteObject(String),
    DeleteLink(String),
    /// Put a link's name and URL back after an update rewrote them
    RestoreLink {
        qr_id: String,
        name: String,
        url: String,
        modified_at: String,
    },
    DeleteImage(String),
    DeleteDocument(String),
}

/// Stack of compensations, unwound in reverse.
#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<Compensation>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, compensation: Compensation) {
        self.entries.push(compensation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain newest first.
    fn drain_newest_first(&mut self) -> impl Iterator<Item = Compensation> + '_ {
        self.entries.drain(..).rev()
    }
}

/// Runs compensations. Never fails: problems are logged and unwinding continues.
#[derive(Clone)]
pub struct Compensator {
    repo: Arc<Repository>,
    gateway: ObjectStoreGateway,
    images: Arc<QrImageGenerator>,
}

impl Compensator {
    pub fn new(
        repo: Arc<Repository>,
        gateway: ObjectStoreGateway,
        images: Arc<QrImageGenerator>,
    ) -> Self {
        Self {
            repo,
            gateway,
            images,
        }
    }

    /// Delete a QR and, if one was uploaded, its image. Failures are logged.
    pub async fn compensate(&self, qr_id: &str, uploaded_key: Option<&str>) {
        if let Some(key) = uploaded_key {
            self.gateway.delete(key).await;
        }
        if let Err(e) = self.repo.purge_qr(qr_id).await {
            tracing::error!(qr_id, error = %e, "Failed to remove QR during rollback");
        }
    }

    /// Undo every recorded step, newest first.
    pub async fn unwind(&self, mut log: UndoLog) {
        let total = log.len();
        let mut failed = 0usize;

        for compensation in log.drain_newest_first() {
            if let Err(e) = self.apply(&compensation).await {
                failed += 1;
                tracing::error!(?compensation, error = %e, "Compensation failed");
            }
        }

        if failed > 0 {
            tracing::warn!(total, failed, "Rollback finished with failures");
        } else {
            tracing::debug!(total, "Rollback finished");
        }
    }

    async fn apply(&self, compensation: &Compensation) -> Result<(), AppError> {
        match compensation {
            Compensation::DeleteQr(id) => {
                self.compensate(id, None).await;
            }
            Compensation::RestoreQr(previous) => {
                self.repo.write_qr(previous).await?;
            }
            Compensation::RenderQrImage { name, qr_url } => {
                self.images.generate(name, qr_url).await?;
            }
            Compensation::DeleteObject(key) => {
                // Orphaned blobs are a leak, not an inconsistency.
                self.gateway.delete(key).await;
            }
            Compensation::DeleteLink(id) => {
                self.repo.delete_link(id).await?;
            }
            Compensation::RestoreLink {
                qr_id,
                name,
                url,
                modified_at,
            } => {
                self.repo.update_link(qr_id, name, url, modified_at).await?;
            }
            Compensation::DeleteImage(id) => {
                self.repo.delete_image(id).await?;
            }
            Compensation::DeleteDocument(id) => {
                self.repo.delete_document(id).await?;
            }
        }
        Ok(())
    }
}

/// One orchestrated operation in flight.
#[derive(Debug)]
pub struct Saga {
    operation: &'static str,
    subject: String,
    state: SagaState,
    undo: UndoLog,
}

impl Saga {
    pub fn begin(operation: &'static str, subject: &str) -> Self {
        tracing::debug!(operation, subject, state = %SagaState::Validating, "Saga started");
        Self {
            operation,
            subject: subject.to_string(),
            state: SagaState::Validating,
            undo: UndoLog::new(),
        }
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn advance(&mut self, next: SagaState) {
        debug_assert!(!self.state.is_terminal(), "saga already finished");
        tracing::debug!(
            operation = self.operation,
            subject = %self.subject,
            from = %self.state,
            to = %next,
            "Saga transition"
        );
        self.state = next;
    }

    /// Record the undo action for a step that just succeeded.
    pub fn record(&mut self, compensation: Compensation) {
        self.undo.push(compensation);
    }

    pub fn undo_log(&mut self) -> &mut UndoLog {
        &mut self.undo
    }

    pub fn commit(mut self) {
        self.advance(SagaState::Committed);
        tracing::info!(operation = self.operation, subject = %self.subject, "Saga committed");
    }

    /// Roll back whatever was recorded and hand the original error back.
    pub async fn fail(mut self, compensator: &Compensator, error: AppError) -> AppError {
        let failed_in = self.state();
        if !self.undo.is_empty() {
            self.advance(SagaState::RollingBack);
            let log = std::mem::take(&mut self.undo);
            compensator.unwind(log).await;
        }
        self.advance(SagaState::Failed);
        tracing::warn!(
            operation = self.operation,
            subject = %self.subject,
            failed_in = %failed_in,
            error = %error,
            "Saga failed"
        );
        error
    }
}
