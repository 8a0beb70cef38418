use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use template_store_api::config::{config, AppConfig};
use template_store_api::database::{migrations, DatabaseManager};
use template_store_api::handlers;
use template_store_api::middleware::{optional_auth, require_admin, require_auth, require_author};
use template_store_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, STRIPE_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn")),
        )
        .init();

    let config = config();
    tracing::info!("Starting Template Store API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect_lazy(&config.database)?;
    if config.database.run_migrations {
        // The server still boots without a database; /health reports it
        if let Err(e) = migrations::run(&pool).await {
            tracing::error!("Migrations failed: {}", e);
        }
    }

    let state = AppState::new(pool.clone(), config)?;
    let app = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Template Store API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close(&pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

fn app(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        // Public
        .merge(auth_public_routes())
        .merge(catalogue_routes())
        .merge(blog_public_routes(state.clone()))
        .merge(payment_public_routes())
        // Any signed-in user
        .merge(account_routes(state.clone()))
        // Authors and admins
        .merge(content_routes(state.clone()))
        // Admins
        .merge(admin_routes(state.clone()));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
        )
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.security.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/confirm", post(auth::confirm_post))
        .route("/auth/forgot-password", post(auth::forgot_password_post))
        .route("/auth/reset-password", post(auth::reset_password_post))
}

fn catalogue_routes() -> Router<AppState> {
    use handlers::public::{categories, templates};

    Router::new()
        .route("/templates", get(templates::list_get))
        .route("/templates/:id", get(templates::show_get))
        .route("/templates/category/:category_id", get(templates::by_category_get))
        .route("/categories", get(categories::list_get))
        .route("/categories/:id", get(categories::show_get))
}

fn blog_public_routes(state: AppState) -> Router<AppState> {
    use handlers::public::blog;

    Router::new()
        .route("/blog", get(blog::list_get))
        .route("/blog/:id", get(blog::show_get))
        .route("/blog/slug/:slug", get(blog::by_slug_get))
        .route("/blog/category/:category_id", get(blog::by_category_get))
        .route("/blog/author/:author_id", get(blog::by_author_get))
        .route_layer(from_fn_with_state(state, optional_auth))
}

fn payment_public_routes() -> Router<AppState> {
    use handlers::public::payment;

    Router::new()
        .route("/payment/success", get(payment::success_get))
        .route("/payment/cancel", get(payment::cancel_get))
        .route("/payment/webhooks/stripe", post(payment::stripe_webhook_post))
}

fn account_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{account, checkout, profile};

    Router::new()
        .route("/auth/change-password", post(account::change_password_post))
        .route("/profile", get(profile::profile_get).put(profile::profile_put))
        .route("/profile/dashboard", get(profile::dashboard_get))
        .route("/profile/orders", get(profile::orders_get))
        .route("/profile/orders/:id", get(profile::order_get))
        .route("/profile/orders/:id/download", get(profile::order_download_get))
        .route("/profile/purchased-templates", get(profile::purchased_templates_get))
        .route("/profile/preferences", get(profile::preferences_get).put(profile::preferences_put))
        .route("/profile/activity", get(profile::activity_get))
        .route("/profile/login-history", get(profile::login_history_get))
        .route("/profile/deactivate", post(profile::deactivate_post))
        .route("/payment/checkout", post(checkout::checkout_post))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn content_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{blog, templates};

    Router::new()
        .route("/templates", post(templates::create_post))
        .route("/templates/:id", put(templates::update_put).delete(templates::delete))
        .route("/blog", post(blog::create_post))
        .route("/blog/:id", put(blog::update_put).delete(blog::delete))
        .route_layer(from_fn(require_author))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::{categories, orders, users};

    Router::new()
        .route("/admin/users", get(users::list_get))
        .route(
            "/admin/users/:id",
            get(users::show_get).put(users::update_put).delete(users::delete),
        )
        .route("/admin/users/:id/role", put(users::role_put))
        .route("/admin/users/:id/suspend", post(users::suspend_post))
        .route("/admin/users/:id/unsuspend", post(users::unsuspend_post))
        .route("/admin/orders/:id/refund", post(orders::refund_post))
        .route("/categories", post(categories::create_post))
        .route("/categories/:id", put(categories::update_put).delete(categories::delete))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, require_auth))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Template Store API",
        "version": version,
        "description": "Template marketplace and blog backend with hosted checkout",
        "endpoints": {
            "health": "/health (public)",
            "auth": "/api/v1/auth/* (public, change-password requires auth)",
            "templates": "/api/v1/templates[/:id] (public read, author/admin write)",
            "blog": "/api/v1/blog[/:id] (public read, author/admin write)",
            "categories": "/api/v1/categories[/:id] (public read, admin write)",
            "profile": "/api/v1/profile/* (protected)",
            "payment": "/api/v1/payment/* (checkout protected, callbacks public)",
            "admin": "/api/v1/admin/* (admin only)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(state.pool()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable",
                })),
            )
        }
    }
}
