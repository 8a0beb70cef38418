// handlers/protected/profile.rs - the signed-in user's own account
//
// GET  /api/v1/profile
// PUT  /api/v1/profile
// GET  /api/v1/profile/dashboard
// GET  /api/v1/profile/orders?limit=
// GET  /api/v1/profile/orders/:id
// GET  /api/v1/profile/orders/:id/download
// GET  /api/v1/profile/purchased-templates
// GET  /api/v1/profile/preferences
// PUT  /api/v1/profile/preferences
// GET  /api/v1/profile/activity?limit=
// GET  /api/v1/profile/login-history?limit=&offset=
// POST /api/v1/profile/deactivate

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{Id, JsonBody, PageQuery};
use crate::database::models::{activity, DeliveryStatus, OrderStatus, UserStatus};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{
    user_service::ProfileUpdate, ActivityService, BlogService, ClientInfo, OrderService, TemplateService,
    UserService,
};
use crate::state::AppState;

pub async fn profile_get(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

pub async fn profile_put(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    client: ClientInfo,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    update.validate().map_err(ApiError::bad_request)?;

    let user = UserService::new(state.pool().clone())
        .update_profile(user.id, &update)
        .await?;

    ActivityService::new(state.pool().clone())
        .record(user.id, activity::PROFILE_UPDATED, None, None, &client)
        .await;

    Ok(Json(json!({ "message": "Profile updated successfully", "user": user })))
}

pub async fn orders_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let orders = OrderService::new(state.pool().clone())
        .list_by_user(user.id, page.limit)
        .await?;
    Ok(Json(json!({ "orders": orders, "count": orders.len() })))
}

pub async fn order_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Id(order_id): Id,
) -> Result<Json<Value>, ApiError> {
    let order = OrderService::new(state.pool().clone())
        .get_for_user(user.id, order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Json(json!({ "order": order })))
}

const RECENT_ORDERS: i64 = 5;

fn account_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

pub async fn dashboard_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let orders = OrderService::new(state.pool().clone());
    let stats = orders.stats_for_user(user.id).await?;
    let recent_orders = orders.list_by_user(user.id, RECENT_ORDERS).await?;
    let posts_authored = BlogService::new(state.pool().clone())
        .count_by_author(user.id)
        .await?;

    Ok(Json(json!({
        "stats": {
            "totalOrders": stats.total_orders,
            "completedOrders": stats.completed_orders,
            "totalSpent": stats.total_spent,
            "templatesPurchased": stats.templates_purchased,
            "blogPostsAuthored": posts_authored,
            "accountAgeDays": account_age_days(user.created_at, Utc::now()),
        },
        "recentOrders": recent_orders,
    })))
}

pub async fn purchased_templates_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let templates = OrderService::new(state.pool().clone())
        .purchased_by_user(user.id)
        .await?;
    Ok(Json(json!({ "templates": templates, "count": templates.len() })))
}

/// Issue a time-limited link to the purchased file. Files kept outside the
/// bucket are handed back as stored.
pub async fn order_download_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    client: ClientInfo,
    Id(order_id): Id,
) -> Result<Json<Value>, ApiError> {
    let orders = OrderService::new(state.pool().clone());
    let order = orders
        .get_by_id(order_id)
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if order.status != OrderStatus::Completed {
        return Err(ApiError::conflict("Order is not completed"));
    }

    let templates = TemplateService::new(state.pool().clone());
    let file_url = templates
        .get_by_id(order.template_id)
        .await?
        .and_then(|t| t.file_url)
        .ok_or_else(|| ApiError::not_found("Template file not available"))?;

    let (url, expires_at) = match state.storage().object_key(&file_url) {
        Some(key) => {
            let signed = state.storage().presign_get(&key)?;
            (signed.url, Some(signed.expires_at))
        }
        None => (file_url, None),
    };

    let order = match expires_at {
        Some(expires_at) => orders.set_download_url(order.id, &url, expires_at).await?,
        None => {
            orders
                .set_delivery_status(order.id, DeliveryStatus::Delivered)
                .await?;
            order
        }
    };
    templates.increment_downloads(order.template_id).await?;

    ActivityService::new(state.pool().clone())
        .record(
            user.id,
            activity::TEMPLATE_DOWNLOADED,
            Some(("template", order.template_id.to_string())),
            Some(json!({ "orderId": order.id })),
            &client,
        )
        .await;

    Ok(Json(json!({
        "downloadUrl": url,
        "expiresAt": expires_at,
        "orderId": order.id,
    })))
}

pub async fn preferences_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let preferences = UserService::new(state.pool().clone()).preferences(user.id).await?;
    Ok(Json(json!({ "preferences": preferences })))
}

/// Partial preferences update; omitted fields keep their current value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub marketing_emails: Option<bool>,
    pub order_notifications: Option<bool>,
    pub blog_notifications: Option<bool>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub theme: Option<String>,
    pub profile_visibility: Option<String>,
    pub show_email: Option<bool>,
    pub show_purchase_history: Option<bool>,
}

pub async fn preferences_put(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    client: ClientInfo,
    JsonBody(update): JsonBody<PreferencesUpdate>,
) -> Result<Json<Value>, ApiError> {
    let users = UserService::new(state.pool().clone());
    let mut prefs = users.preferences(user.id).await?;

    if let Some(v) = update.marketing_emails {
        prefs.marketing_emails = v;
    }
    if let Some(v) = update.order_notifications {
        prefs.order_notifications = v;
    }
    if let Some(v) = update.blog_notifications {
        prefs.blog_notifications = v;
    }
    if let Some(v) = update.language {
        prefs.language = v;
    }
    if let Some(v) = update.timezone {
        prefs.timezone = v;
    }
    if let Some(v) = update.theme {
        prefs.theme = v;
    }
    if let Some(v) = update.profile_visibility {
        prefs.profile_visibility = v;
    }
    if let Some(v) = update.show_email {
        prefs.show_email = v;
    }
    if let Some(v) = update.show_purchase_history {
        prefs.show_purchase_history = v;
    }
    prefs.validate().map_err(ApiError::bad_request)?;

    let prefs = users.save_preferences(&prefs).await?;

    ActivityService::new(state.pool().clone())
        .record(user.id, activity::PREFERENCES_UPDATED, None, None, &client)
        .await;

    Ok(Json(json!({ "message": "Preferences updated successfully", "preferences": prefs })))
}

pub async fn activity_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let activities = ActivityService::new(state.pool().clone())
        .recent(user.id, page.limit)
        .await?;
    Ok(Json(json!({ "activities": activities, "count": activities.len() })))
}

pub async fn login_history_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let (history, total) = ActivityService::new(state.pool().clone())
        .login_history(user.id, page.limit, page.offset)
        .await?;

    Ok(Json(json!({
        "history": history,
        "total": total,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

pub async fn deactivate_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    client: ClientInfo,
) -> Result<Json<Value>, ApiError> {
    UserService::new(state.pool().clone())
        .set_status(user.id, UserStatus::Deactivated, None)
        .await?;

    ActivityService::new(state.pool().clone())
        .record(user.id, activity::ACCOUNT_DEACTIVATED, None, None, &client)
        .await;
    tracing::info!("User {} deactivated their account", user.id);

    Ok(Json(json!({ "message": "Account deactivated successfully" })))
}
