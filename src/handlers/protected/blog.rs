// handlers/protected/blog.rs - blog authoring (author or admin)
//
// POST   /api/v1/blog
// PUT    /api/v1/blog/:id
// DELETE /api/v1/blog/:id
//
// Authors may only change their own posts; admins may change any.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::{Id, JsonBody};
use crate::database::models::{BlogPost, User};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{blog_service::BlogPostInput, BlogService};
use crate::state::AppState;

fn ensure_editable(post: &BlogPost, user: &User) -> Result<(), ApiError> {
    if user.is_admin() || post.author_id == user.id {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only modify your own blog posts"))
    }
}

async fn load_editable(service: &BlogService, id: uuid::Uuid, user: &User) -> Result<BlogPost, ApiError> {
    let post = service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog post not found"))?;
    ensure_editable(&post, user)?;
    Ok(post)
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(input): JsonBody<BlogPostInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    input.validate_new().map_err(ApiError::bad_request)?;

    let post = BlogService::new(state.pool().clone()).create(user.id, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Blog post created successfully", "blogPost": post })),
    ))
}

pub async fn update_put(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Id(id): Id,
    JsonBody(input): JsonBody<BlogPostInput>,
) -> Result<Json<Value>, ApiError> {
    input.validate_update().map_err(ApiError::bad_request)?;

    let service = BlogService::new(state.pool().clone());
    load_editable(&service, id, &user).await?;
    let post = service.update(id, &input).await?;

    Ok(Json(json!({ "message": "Blog post updated successfully", "blogPost": post })))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    let service = BlogService::new(state.pool().clone());
    load_editable(&service, id, &user).await?;
    service.soft_delete(id).await?;

    Ok(Json(json!({ "message": "Blog post deleted successfully" })))
}
