/// Account management endpoints
///
/// # Endpoints
///
/// - `GET /users` - All users, newest first (manager)
/// - `GET /users/employees` - Employees only (manager)
/// - `GET /users/:id` - One user (manager, or the user themself)
/// - `PUT /users/:id` - Edit a user (manager, or the user themself)
/// - `DELETE /users/:id` - Delete a user with their tasks and reviews (manager)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    response::ApiResponse,
    routes::found,
};
use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use taskreview_shared::{
    auth::{
        authorization::{ensure_self_or_manager, require_role},
        middleware::AuthContext,
        password,
    },
    models::user::{Role, UpdateUser, User},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be between 3 and 100 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,

    /// Managers only
    pub role: Option<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<User>>> {
    require_role(&auth, Role::Manager)?;

    let users = state.store.list_users(None).await?;
    Ok(ApiResponse::list(users))
}

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<User>>> {
    require_role(&auth, Role::Manager)?;

    let employees = state.store.list_users(Some(Role::Employee)).await?;
    Ok(ApiResponse::list(employees))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    ensure_self_or_manager(&auth, id)?;

    let user = found(state.store.find_user(id).await?, "User not found")?;
    Ok(ApiResponse::ok(user))
}

/// Edit a user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email taken
/// - `403 Forbidden`: Editing someone else's account, a non-manager changing
///   a role, or anyone but the account holder changing the password
/// - `404 Not Found`: No such user
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(mut req): Json<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    ensure_self_or_manager(&auth, id)?;

    if req.role.is_some() && auth.role != Role::Manager {
        return Err(ApiError::Forbidden("Only managers can change roles".to_string()));
    }
    if req.password.is_some() && auth.user_id != id {
        return Err(ApiError::Forbidden(
            "Only the account holder can change the password".to_string(),
        ));
    }

    req.username = req.username.map(|username| username.trim().to_string());
    req.email = req.email.map(|email| email.trim().to_string());
    req.validate()?;

    let mut user = found(state.store.find_user(id).await?, "User not found")?;

    let password_hash = req
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    user.apply_update(
        UpdateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: req.role,
        },
        Utc::now(),
    );
    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, updated_by = %auth.user_id, "User updated");

    Ok(ApiResponse::ok(user).with_message("User updated successfully"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_role(&auth, Role::Manager)?;

    if !state.store.delete_user(id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(ApiResponse::message("User deleted successfully"))
}
