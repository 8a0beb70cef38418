// handlers/protected/templates.rs - catalogue management (author or admin)
//
// POST   /api/v1/templates
// PUT    /api/v1/templates/:id
// DELETE /api/v1/templates/:id

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::{Id, JsonBody};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{template_service::TemplateInput, TemplateService};
use crate::state::AppState;

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(input): JsonBody<TemplateInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    input.validate_new().map_err(ApiError::bad_request)?;

    let template = TemplateService::new(state.pool().clone()).create(&input).await?;
    tracing::info!("User {} created template {}", user.id, template.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Template created successfully", "template": template })),
    ))
}

pub async fn update_put(
    State(state): State<AppState>,
    Id(id): Id,
    JsonBody(input): JsonBody<TemplateInput>,
) -> Result<Json<Value>, ApiError> {
    input.validate_update().map_err(ApiError::bad_request)?;

    let template = TemplateService::new(state.pool().clone()).update(id, &input).await?;
    Ok(Json(json!({ "message": "Template updated successfully", "template": template })))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    TemplateService::new(state.pool().clone()).soft_delete(id).await?;
    tracing::info!("User {} deleted template {}", user.id, id);
    Ok(Json(json!({ "message": "Template deleted successfully" })))
}
