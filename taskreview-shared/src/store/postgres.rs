/// PostgreSQL store
///
/// Thin adapter over the model query functions. Unique violations on the
/// `users` table become [`StoreError::Conflict`]; review completion runs in a
/// transaction that locks the review and the employee row.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::db::pool::health_check;
use crate::models::review::{Review, ReviewFilter, ReviewStatus};
use crate::models::task::{Task, TaskFilter};
use crate::models::user::{Role, User};
use crate::models::DomainError;
use crate::scoring::apply_submitted_score;

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique violation on `users` to a readable conflict
fn user_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some(c) if c.contains("email") => "Email is already registered",
                Some(c) if c.contains("username") => "Username is already taken",
                _ => "User already exists",
            };
            return StoreError::Conflict(message.to_string());
        }
    }
    StoreError::Database(err)
}

fn found(updated: bool, entity: &'static str) -> Result<(), StoreError> {
    if updated {
        Ok(())
    } else {
        Err(StoreError::NotFound(entity))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        User::insert(&self.pool, user).await.map_err(user_write_error)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::find_by_ids(&self.pool, ids).await?)
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool, role).await?)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        User::save_account(&self.pool, user)
            .await
            .map_err(user_write_error)?
            .ok_or(StoreError::NotFound("User"))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        Ok(Task::insert(&self.pool, task).await?)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn find_tasks(&self, ids: &[Uuid]) -> Result<Vec<Task>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Task::find_by_ids(&self.pool, ids).await?)
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list(&self.pool, filter).await?)
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        Task::save_details(&self.pool, task)
            .await?
            .ok_or(StoreError::NotFound("Task"))
    }

    async fn submit_task(&self, task: &Task) -> Result<(), StoreError> {
        if Task::save_submission(&self.pool, task).await? {
            return Ok(());
        }
        match Task::find_by_id(&self.pool, task.id).await? {
            Some(_) => Err(DomainError::AlreadyCompleted("Task").into()),
            None => Err(StoreError::NotFound("Task")),
        }
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn recent_completed_tasks(&self, employee_id: Uuid, limit: usize) -> Result<Vec<Task>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(Task::recent_completed(&self.pool, employee_id, limit).await?)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        Ok(Review::insert(&self.pool, review).await?)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(Review::find_by_id(&self.pool, id).await?)
    }

    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError> {
        Ok(Review::list(&self.pool, filter).await?)
    }

    async fn update_review(&self, review: &Review) -> Result<Review, StoreError> {
        if let Some(stored) = Review::save_details(&self.pool, review).await? {
            return Ok(stored);
        }
        match Review::find_by_id(&self.pool, review.id).await? {
            Some(_) => Err(DomainError::AlreadyCompleted("Review").into()),
            None => Err(StoreError::NotFound("Review")),
        }
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Review::delete(&self.pool, id).await?)
    }

    async fn complete_review(&self, review: &Review) -> Result<User, StoreError> {
        let score = review.score.unwrap_or(0);
        let mut tx = self.pool.begin().await?;

        // Lock order: review, then employee
        match Review::status_for_update(&mut *tx, review.id).await? {
            None => return Err(StoreError::NotFound("Review")),
            Some(ReviewStatus::Completed) => {
                return Err(DomainError::AlreadyCompleted("Review").into());
            }
            Some(ReviewStatus::Pending) => {}
        }

        let mut employee = User::find_by_id_for_update(&mut *tx, review.employee_id)
            .await?
            .ok_or(StoreError::NotFound("User"))?;

        let blended = apply_submitted_score(&mut employee.modules_scores, review.module_id, score);
        employee.updated_at = review.updated_at;

        found(
            User::save_scores(&mut *tx, employee.id, &employee.modules_scores, employee.updated_at).await?,
            "User",
        )?;
        found(Review::save_completion(&mut *tx, review).await?, "Review")?;
        tx.commit().await?;

        info!(
            review_id = %review.id,
            employee_id = %employee.id,
            module_id = review.module_id,
            score,
            blended,
            "Review completed"
        );

        Ok(employee)
    }
}
