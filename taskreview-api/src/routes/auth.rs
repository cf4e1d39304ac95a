/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Create an account and get a token
/// - `POST /auth/login` - Exchange credentials for a token
/// - `GET /auth/me` - Current user (authenticated)
///
/// Register and login both answer with
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJ...",
///     "user": { "id": "uuid", "username": "jdoe", "role": "employee", "modules_scores": [...] }
///   }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use taskreview_shared::{
    auth::{
        jwt::{self, Claims},
        password,
    },
    models::user::{CreateUser, Role, User},
};
use tracing::{info, warn};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be between 3 and 100 characters"))]
    pub username: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Defaults to employee
    pub role: Option<Role>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token plus the authenticated user
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Signs a token for `user` with the configured lifetime
pub(crate) fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    let lifetime = Duration::hours(state.config.jwt.expiration_hours);
    let claims = Claims::with_expiration(user.id, user.role, lifetime);
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email taken
pub async fn register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_string();
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;
    let user = CreateUser::new(req.username, req.email, password_hash, req.role.unwrap_or_default())
        .into_user(Utc::now());

    state.store.create_user(&user).await?;
    info!(user_id = %user.id, role = %user.role, "User registered");

    let token = issue_token(&state, &user)?;
    Ok(ApiResponse::created(AuthPayload { token, user }).with_message("User registered successfully"))
}

/// Log in with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Malformed request
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<ApiResponse<AuthPayload>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        warn!("Login attempt for unknown email");
        return Err(invalid());
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");
    let token = issue_token(&state, &user)?;
    Ok(ApiResponse::ok(AuthPayload { token, user }))
}

/// Current user
pub async fn me(Extension(user): Extension<User>) -> ApiResponse<User> {
    ApiResponse::ok(user)
}
