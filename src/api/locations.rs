//! Location API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateLocationRequest, Location};
use crate::AppState;

/// GET /api/locations - List all locations.
pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<Location>> {
    success(state.repo.list_locations().await?)
}

/// GET /api/locations/:term - Get a location by id, number or name.
pub async fn get_location(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ApiResult<Location> {
    match state.repo.find_location(&term).await? {
        Some(location) => success(location),
        None => Err(AppError::NotFound(format!("Location {} not found", term))),
    }
}

/// POST /api/locations - Create a new location.
pub async fn create_location(
    State(state): State<AppState>,
    Json(request): Json<CreateLocationRequest>,
) -> ApiResult<Location> {
    request.validate().map_err(AppError::Validation)?;

    let location = state.repo.create_location(&request).await?;
    tracing::info!(id = %location.id, number = location.location_number, "Location created");
    success(location)
}
