/// Bearer token authentication
///
/// Validates the JWT, then reloads the user from the store so that deleted
/// accounts are locked out and role changes apply immediately. On success the
/// request carries two extensions:
///
/// - [`AuthContext`] for authorization checks
/// - the full [`User`] record for handlers that return it

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskreview_shared::auth::{
    jwt,
    middleware::{bearer_token, AuthContext, AuthError},
};
use taskreview_shared::models::user::User;
use tracing::{debug, warn};

use crate::{app::AppState, error::ApiError};

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_owned();
    let token = bearer_token(req.headers()).map(str::to_owned);

    let user = authenticate(&state, token).await.map_err(|e| {
        warn!(path = %path, error = %e, "Authentication failed");
        e
    })?;

    debug!(user_id = %user.id, role = %user.role, "Authenticated request");

    req.extensions_mut().insert(AuthContext::from_user(&user));
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Resolves the bearer token to a live user
///
/// Takes the token by value so the request is not borrowed across the store
/// lookup.
async fn authenticate(state: &AppState, token: Result<String, AuthError>) -> Result<User, ApiError> {
    let token = token?;
    let claims = jwt::validate_token(&token, state.jwt_secret())?;

    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AuthError::UnknownUser.into())
}
