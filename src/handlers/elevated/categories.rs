// handlers/elevated/categories.rs
//
// POST   /api/v1/categories
// PUT    /api/v1/categories/:id
// DELETE /api/v1/categories/:id

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::{Id, JsonBody};
use crate::error::ApiError;
use crate::services::{category_service::CategoryInput, CategoryService};
use crate::state::AppState;

pub async fn create_post(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    input.validate_new().map_err(ApiError::bad_request)?;
    let category = CategoryService::new(state.pool().clone()).create(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created successfully", "category": category })),
    ))
}

pub async fn update_put(
    State(state): State<AppState>,
    Id(id): Id,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<Json<Value>, ApiError> {
    input.validate_update().map_err(ApiError::bad_request)?;
    let category = CategoryService::new(state.pool().clone()).update(id, &input).await?;
    Ok(Json(json!({ "message": "Category updated successfully", "category": category })))
}

pub async fn delete(State(state): State<AppState>, Id(id): Id) -> Result<Json<Value>, ApiError> {
    CategoryService::new(state.pool().clone()).soft_delete(id).await?;
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
