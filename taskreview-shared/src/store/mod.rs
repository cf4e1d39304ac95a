/// Persistence port for users, tasks and reviews
///
/// Handlers talk to storage only through the [`Store`] trait so the API can
/// run against PostgreSQL in production and an in-memory map in tests.
///
/// # Adapters
///
/// - [`postgres::PgStore`]: sqlx over PostgreSQL
/// - [`memory::MemoryStore`]: `HashMap`s behind a `tokio::sync::RwLock`
///
/// # Contract
///
/// - Records are checked by their model methods before they reach the store;
///   adapters enforce uniqueness, existence and completion.
/// - Updates write only the columns their caller owns and return the stored
///   record. Module scores change only through [`Store::complete_review`], and
///   a completed task or review is never moved back by a stale edit.
/// - Lists are newest first (`created_at` descending).
/// - Deleting a user removes their tasks and reviews; deleting a task removes
///   its reviews.
/// - [`Store::complete_review`] writes the completed review and the blended
///   module score together, or neither.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskreview_shared::models::user::{CreateUser, Role};
/// use taskreview_shared::store::{memory::MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
///
/// let user = CreateUser::new("ana", "ana@example.com", "$argon2id$...", Role::Employee)
///     .into_user(chrono::Utc::now());
/// store.create_user(&user).await?;
///
/// assert!(store.find_user_by_email("ANA@example.com").await?.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::review::{Review, ReviewFilter};
use crate::models::task::{Task, TaskFilter};
use crate::models::user::{Role, User};
use crate::models::DomainError;

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field (username, email) is already taken
    #[error("{0}")]
    Conflict(String),

    /// The record to update is gone
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The stored record no longer allows the change
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Storage operations used by the API
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    // Users

    /// Inserts a new user; `Conflict` on a duplicate username or email
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Looks up a user by email, case-insensitively
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fetches the users with the given IDs, in no particular order
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError>;

    /// Writes the account fields of a user and returns the stored record
    ///
    /// `modules_scores` is never written here. `Conflict` on a duplicate
    /// username or email.
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;

    /// Deletes a user with everything assigned to or by them
    ///
    /// Returns false if the user didn't exist.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    // Tasks

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_tasks(&self, ids: &[Uuid]) -> Result<Vec<Task>, StoreError>;

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Writes a manager's edits and returns the stored task
    ///
    /// Leaves the submission notes alone. A task completed in the meantime
    /// stays completed with its first submission date.
    async fn update_task(&self, task: &Task) -> Result<Task, StoreError>;

    /// Persists a submission made with [`Task::submit`]
    ///
    /// # Errors
    ///
    /// - `Domain(AlreadyCompleted)` if the stored task was completed in the
    ///   meantime
    /// - `NotFound` if the task is gone
    async fn submit_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Deletes a task and its reviews; false if it didn't exist
    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Latest completed tasks of one employee, by submission date
    async fn recent_completed_tasks(&self, employee_id: Uuid, limit: usize) -> Result<Vec<Task>, StoreError>;

    // Reviews

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError>;

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;

    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError>;

    /// Writes a manager's edits to a pending review and returns it
    ///
    /// Only the module, title and description change. `Domain(AlreadyCompleted)`
    /// if the stored review is completed.
    async fn update_review(&self, review: &Review) -> Result<Review, StoreError>;

    /// Deletes a review; false if it didn't exist
    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Persists a review completed with [`Review::submit`] and blends its
    /// score into the employee's module scores
    ///
    /// Both writes happen together. Returns the updated employee.
    ///
    /// # Errors
    ///
    /// - `Domain(AlreadyCompleted)` if the stored review was completed in the
    ///   meantime
    /// - `NotFound` if the review or the employee is gone
    async fn complete_review(&self, review: &Review) -> Result<User, StoreError>;
}
