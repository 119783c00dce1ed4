//! QR API endpoints.
//!
//! Writes are spawned onto their own task so a dropped request cannot stop
//! a saga half-way.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{success, ApiResult, FormWithFiles};
use crate::errors::AppError;
use crate::models::{CreateQrRequest, DeleteQrResponse, QrView, UpdateQrRequest};
use crate::AppState;

/// Query parameters for listing QRs.
#[derive(Debug, Default, Deserialize)]
pub struct QrFilterQuery {
    /// Substring of the location name
    pub location: Option<String>,
    /// Substring of the category name
    pub category: Option<String>,
}

/// GET /api/qrs - List QRs, optionally filtered by location and category name.
pub async fn list_qrs(
    State(state): State<AppState>,
    Query(query): Query<QrFilterQuery>,
) -> ApiResult<Vec<QrView>> {
    let views = state
        .content
        .filter(query.location.as_deref(), query.category.as_deref())
        .await?;
    success(views)
}

/// GET /api/qrs/:term - Get a QR by id, name or URL slug.
pub async fn get_qr(State(state): State<AppState>, Path(term): Path<String>) -> ApiResult<QrView> {
    success(state.content.find_one(&term).await?)
}

/// GET /api/qrs/search/:term - Search QR names.
pub async fn search_qrs(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ApiResult<Vec<QrView>> {
    success(state.content.search(&term).await?)
}

/// POST /api/qrs - Create a QR with its image and children.
pub async fn create_qr(
    State(state): State<AppState>,
    FormWithFiles { fields, files }: FormWithFiles<CreateQrRequest>,
) -> ApiResult<QrView> {
    let input = fields.validate().map_err(AppError::Validation)?;

    let orchestrator = state.orchestrator.clone();
    let view = tokio::spawn(async move { orchestrator.create(input, files).await }).await??;

    success(view)
}

/// PATCH /api/qrs/:term - Update a QR, appending any uploaded files.
pub async fn update_qr(
    State(state): State<AppState>,
    Path(term): Path<String>,
    FormWithFiles { fields, files }: FormWithFiles<UpdateQrRequest>,
) -> ApiResult<QrView> {
    let changes = fields.validate().map_err(AppError::Validation)?;

    let orchestrator = state.orchestrator.clone();
    let view =
        tokio::spawn(async move { orchestrator.update(&term, changes, files).await }).await??;

    success(view)
}

/// DELETE /api/qrs/:id - Delete a QR and everything it owns.
pub async fn delete_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteQrResponse> {
    let orchestrator = state.orchestrator.clone();
    let response = tokio::spawn(async move { orchestrator.remove(&id).await }).await??;

    success(response)
}
