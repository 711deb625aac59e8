use axum::{
    Extension, Json,
    extract::{Multipart, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::MultipartForm;
use super::{AccountDto, ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::access::Principal;
use crate::services::{AuthError, LoginResult, ProfileUpdate, SignupRequest};

const SESSION_USER_KEY: &str = "user_id";

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::unauthorized("Invalid username or password")
            }
            AuthError::UserNotFound => Self::NotFound("User not found".to_string()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Storage(e) => Self::internal(e.to_string()),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the caller from:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
pub async fn resolve_principal(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
) -> Result<Option<Principal>, ApiError> {
    let auth = &state.shared.auth_service;

    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await
        && let Some(principal) = auth.principal_for_user(user_id).await?
    {
        return Ok(Some(principal));
    }

    if let Some(key) = extract_api_key(headers) {
        return Ok(auth.principal_for_api_key(&key).await?);
    }

    Ok(None)
}

/// Rejects anonymous requests and makes the [`Principal`] available to handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let principal = resolve_principal(&state, &session, &headers)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    tracing::Span::current().record("user_id", principal.user_id.value());
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

async fn start_session(session: &Session, user_id: i32) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Creates a student account and signs it in.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SignupBody>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let result = state
        .shared
        .auth_service
        .signup(SignupRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            password_confirmation: payload.password_confirmation,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    start_session(&session, result.user_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/login
/// Returns the role, its home path and the API key on success.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .shared
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;

    start_session(&session, result.user_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state.shared.auth_service.account(&principal).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// PUT /auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state
        .shared
        .auth_service
        .update_profile(
            &principal,
            ProfileUpdate {
                first_name: payload.first_name,
                last_name: payload.last_name,
                bio: payload.bio,
                phone: payload.phone,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(account)))
}

/// POST /auth/me/avatar
/// Multipart field `profile_picture`.
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let mut form = MultipartForm::read(multipart).await?;
    let upload = form
        .take_file("profile_picture")
        .ok_or_else(|| ApiError::validation("Missing 'profile_picture' file"))?;

    let account = state
        .shared
        .auth_service
        .set_avatar(&principal, upload)
        .await?;
    Ok(Json(ApiResponse::success(account)))
}

/// GET /auth/api-key
pub async fn get_api_key(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let user = state
        .store()
        .get_user(principal.user_id.value())
        .await?
        .ok_or_else(|| ApiError::not_found("User", principal.user_id))?;

    Ok(Json(ApiResponse::success(ApiKeyResponse {
        api_key: user.api_key,
    })))
}

/// POST /auth/api-key/regenerate
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state
        .shared
        .auth_service
        .regenerate_api_key(&principal)
        .await?;

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}
