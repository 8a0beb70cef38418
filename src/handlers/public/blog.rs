// handlers/public/blog.rs - blog reading
//
// GET /api/v1/blog
// GET /api/v1/blog/:id                    (drafts visible to their author and admins)
// GET /api/v1/blog/slug/:slug
// GET /api/v1/blog/category/:category_id
// GET /api/v1/blog/author/:author_id
//
// Mounted behind optional_auth so drafts can be shown to the people allowed
// to see them.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{Id, PageQuery};
use crate::database::models::BlogPost;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{blog_service::Visibility, BlogService};
use crate::state::AppState;

fn viewer(user: &Option<CurrentUser>) -> Option<(uuid::Uuid, bool)> {
    user.as_ref().map(|CurrentUser(u)| (u.id, u.is_admin()))
}

fn listing(posts: Vec<BlogPost>, limit: i64, offset: i64) -> Json<Value> {
    Json(json!({
        "blogPosts": posts,
        "count": posts.len(),
        "limit": limit,
        "offset": offset,
    }))
}

/// Count a view on published posts and hand the post back
async fn reveal(state: &AppState, post: Option<BlogPost>, user: &Option<CurrentUser>) -> Result<Json<Value>, ApiError> {
    let mut post = post
        .filter(|p| p.visible_to(viewer(user)))
        .ok_or_else(|| ApiError::not_found("Blog post not found"))?;

    if post.published {
        BlogService::new(state.pool().clone()).increment_view_count(post.id).await?;
        post.view_count += 1;
    }

    Ok(Json(json!({ "blogPost": post })))
}

pub async fn list_get(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let posts = BlogService::new(state.pool().clone())
        .list(page.limit, page.offset, Visibility::PublishedOnly)
        .await?;
    Ok(listing(posts, page.limit, page.offset))
}

pub async fn show_get(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    let post = BlogService::new(state.pool().clone()).get_by_id(id).await?;
    reveal(&state, post, &user).await
}

pub async fn by_slug_get(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let post = BlogService::new(state.pool().clone()).get_by_slug(&slug).await?;
    reveal(&state, post, &user).await
}

pub async fn by_category_get(
    State(state): State<AppState>,
    Id(category_id): Id,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let posts = BlogService::new(state.pool().clone())
        .list_by_category(category_id, page.limit, page.offset)
        .await?;
    Ok(listing(posts, page.limit, page.offset))
}

pub async fn by_author_get(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Id(author_id): Id,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let visibility = match viewer(&user) {
        Some((id, is_admin)) if is_admin || id == author_id => Visibility::IncludeDrafts,
        _ => Visibility::PublishedOnly,
    };

    let posts = BlogService::new(state.pool().clone())
        .list_by_author(author_id, page.limit, page.offset, visibility)
        .await?;
    Ok(listing(posts, page.limit, page.offset))
}
