/// Domain records and their database operations
///
/// # Models
///
/// - `user`: Accounts with a role and per-module scores
/// - `task`: Work items assigned by a manager to an employee
/// - `review`: Self-scored review assignments tied to a task and a module
///
/// Records are plain structs. Field rules that the storage layer cannot
/// express (future deadlines, one-way completion, score ranges) are enforced
/// by the methods on each record before it is written, so every store
/// backend sees the same checked data.
///
/// # Example
///
/// ```
/// use taskreview_shared::models::user::{CreateUser, Role};
///
/// let user = CreateUser::new("alice", "Alice@Example.com", "$argon2id$...", Role::Employee)
///     .into_user(chrono::Utc::now());
///
/// assert_eq!(user.email, "alice@example.com");
/// assert_eq!(user.modules_scores.len(), 10);
/// ```

pub mod review;
pub mod task;
pub mod user;

/// Error raised when a record change breaks a domain rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A field value is out of range or otherwise invalid
    #[error("{message}")]
    Invalid {
        /// Field that failed the check
        field: &'static str,

        /// Human-readable reason
        message: String,
    },

    /// The record was already submitted and cannot be submitted again
    #[error("{0} is already completed")]
    AlreadyCompleted(&'static str),
}

impl DomainError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Invalid {
            field,
            message: message.into(),
        }
    }
}
