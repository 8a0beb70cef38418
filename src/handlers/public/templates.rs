// handlers/public/templates.rs - storefront catalogue
//
// GET /api/v1/templates
// GET /api/v1/templates/:id
// GET /api/v1/templates/category/:category_id

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{Id, PageQuery};
use crate::error::ApiError;
use crate::services::TemplateService;
use crate::state::AppState;

pub async fn list_get(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let templates = TemplateService::new(state.pool().clone())
        .list(page.limit, page.offset)
        .await?;

    Ok(Json(json!({
        "templates": templates,
        "count": templates.len(),
        "limit": page.limit,
        "offset": page.offset,
    })))
}

pub async fn show_get(State(state): State<AppState>, Id(id): Id) -> Result<Json<Value>, ApiError> {
    let template = TemplateService::new(state.pool().clone())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Template not found"))?;

    Ok(Json(json!({ "template": template })))
}

pub async fn by_category_get(
    State(state): State<AppState>,
    Id(category_id): Id,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let templates = TemplateService::new(state.pool().clone())
        .list_by_category(category_id, page.limit, page.offset)
        .await?;

    Ok(Json(json!({
        "templates": templates,
        "count": templates.len(),
        "limit": page.limit,
        "offset": page.offset,
    })))
}
