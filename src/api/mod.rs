use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::{Config, StorageBackend};
use crate::state::SharedState;

mod analytics;
pub mod auth;
mod courses;
mod enrollments;
mod error;
mod forms;
mod observability;
mod system;
pub mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        self.shared.config()
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let config = state.config();
    let cors_origins = config.server.cors_allowed_origins.clone();
    let media_root = match config.storage.backend {
        StorageBackend::Local => Some(config.storage.media_root.clone()),
        StorageBackend::Http => None,
    };
    let body_limit = config.storage.max_upload_mb * 1024 * 1024;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_idle_minutes,
        )));

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/courses", get(courses::list_courses))
        .route("/courses/{id}", get(courses::get_course))
        .route("/health", get(system::health_live))
        .route("/health/ready", get(system::health_ready))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let mut app = Router::new().nest("/api", api_router);
    if let Some(root) = media_root {
        app = app.nest_service("/media", tower_http::services::ServeDir::new(root));
    }

    app.layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(observability::security_headers_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route("/auth/me/avatar", post(auth::upload_avatar))
        .route("/auth/api-key", get(auth::get_api_key))
        .route("/auth/api-key/regenerate", post(auth::regenerate_api_key))
        .route("/courses", post(courses::create_course))
        .route(
            "/courses/{id}",
            put(courses::update_course).delete(courses::delete_course),
        )
        .route("/courses/{id}/thumbnail", post(courses::upload_thumbnail))
        .route("/courses/{id}/materials", post(courses::add_material))
        .route("/courses/{id}/videos", post(courses::add_video))
        .route("/courses/{id}/enroll", post(enrollments::enroll))
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments/{id}/status", put(enrollments::update_status))
        .route(
            "/enrollments/{id}/progress",
            put(enrollments::update_progress),
        )
        .route("/users", get(users::list_users))
        .route("/users/{id}/role", put(users::change_role))
        .route("/analytics", get(analytics::get_report))
        .route("/analytics/students/{id}", get(analytics::get_student))
        .route("/dashboard/student", get(analytics::student_dashboard))
        .route("/dashboard/achievements", get(analytics::achievements))
        .route("/dashboard/admin", get(analytics::admin_dashboard))
        .route("/dashboard/instructor", get(analytics::teaching_dashboard))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
