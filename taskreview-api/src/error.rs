/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`; errors convert into the JSON failure
/// envelope with the matching status code:
///
/// ```json
/// { "success": false, "message": "Task is already completed" }
/// ```
///
/// Unclassified failures answer 500 and carry the underlying message in
/// `error`.
///
/// # Example
///
/// ```
/// use taskreview_api::error::{ApiError, ApiResult};
///
/// fn find(id: u32) -> ApiResult<&'static str> {
///     match id {
///         1 => Ok("found"),
///         _ => Err(ApiError::NotFound("Task not found".to_string())),
///     }
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskreview_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};
use taskreview_shared::models::DomainError;
use taskreview_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Field validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub message: String,

    /// Underlying error for server failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Per-field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message) => ErrorResponse {
                success: false,
                message,
                error: None,
                details: None,
            },
            ApiError::ValidationError(details) => ErrorResponse {
                success: false,
                message: details
                    .iter()
                    .map(|d| d.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                error: None,
                details: Some(details),
            },
            ApiError::InternalError(error) => {
                tracing::error!("Internal error: {}", error);
                ErrorResponse {
                    success: false,
                    message: "Server error".to_string(),
                    error: Some(error),
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Invalid { field, message } => ApiError::invalid(field, message),
            DomainError::AlreadyCompleted(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::BadRequest(msg),
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::Domain(domain) => domain.into(),
            StoreError::Database(_) | StoreError::Migration(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Not authorized, no token".to_string()),
            AuthError::InvalidFormat(_) | AuthError::InvalidToken(_) | AuthError::UnknownUser => {
                ApiError::Unauthorized(format!("Not authorized, {}", err.to_string().to_lowercase()))
            }
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Not authorized, token expired".to_string()),
            JwtError::InvalidIssuer | JwtError::ValidationError(_) => {
                ApiError::Unauthorized("Not authorized, token failed".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskreview_shared::models::user::Role;
    use validator::Validate;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid("title", "x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StoreError::Conflict("Email is already registered".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DomainError::AlreadyCompleted("Task")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::NotFound("Review")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AuthzError::InsufficientRole {
                required: Role::Manager,
                actual: Role::Employee,
            })
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::from(AuthError::MissingCredentials).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(JwtError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_already_completed_message() {
        match ApiError::from(DomainError::AlreadyCompleted("Task")) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Task is already completed"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_rejection_is_bad_request() {
        let rejection = axum::Json::<Sample>::from_bytes(br#"{"username":"ana"}"#).unwrap_err();
        let err = ApiError::from(rejection);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::BadRequest(msg) => assert!(msg.contains("email"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[derive(Debug, Validate, serde::Deserialize)]
    struct Sample {
        #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
        username: String,
        #[validate(email(message = "Please provide a valid email"))]
        email: String,
    }

    #[test]
    fn test_from_validation_errors() {
        let sample = Sample {
            username: "ab".to_string(),
            email: "nope".to_string(),
        };

        let err = ApiError::from(sample.validate().unwrap_err());
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[1].message, "Username must be at least 3 characters");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
