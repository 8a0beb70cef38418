// handlers/public/categories.rs
//
// GET /api/v1/categories
// GET /api/v1/categories/:id

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::Id;
use crate::error::ApiError;
use crate::services::CategoryService;
use crate::state::AppState;

pub async fn list_get(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let categories = CategoryService::new(state.pool().clone()).list().await?;
    Ok(Json(json!({ "categories": categories, "count": categories.len() })))
}

pub async fn show_get(State(state): State<AppState>, Id(id): Id) -> Result<Json<Value>, ApiError> {
    let category = CategoryService::new(state.pool().clone())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(Json(json!({ "category": category })))
}
