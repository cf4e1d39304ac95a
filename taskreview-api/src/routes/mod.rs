/// API route handlers
///
/// - `health`: Liveness and store connectivity
/// - `auth`: Register, login, current user
/// - `tasks`: Task CRUD and submission
/// - `reviews`: Review CRUD, submission and module suggestions
/// - `users`: Account management

pub mod auth;
pub mod health;
pub mod reviews;
pub mod tasks;
pub mod users;

use crate::error::{ApiError, ApiResult};

/// Unwraps a lookup result, answering 404 with `message` when empty
pub(crate) fn found<T>(value: Option<T>, message: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::NotFound(message.to_string()))
}
