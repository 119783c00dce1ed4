//! Category API endpoints.
//!
//! There is no update route: a category's type is fixed once QRs hang off it.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest};
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    success(state.repo.list_categories().await?)
}

/// GET /api/categories/:id - Get a single category.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    match state.repo.get_category(&id).await? {
        Some(category) => success(category),
        None => Err(AppError::NotFound(format!("Category {} not found", id))),
    }
}

/// POST /api/categories - Create a new category.
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    request.validate().map_err(AppError::Validation)?;

    let category = state.repo.create_category(&request).await?;
    tracing::info!(id = %category.id, kind = %category.category_type, "Category created");
    success(category)
}
