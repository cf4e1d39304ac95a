/// Review model and database operations
///
/// A review asks an employee to assess their own work on a task against one
/// skill module. The employee submits feedback and a score once; the score is
/// then blended into their module scores (see [`crate::scoring`]).
///
/// # State Machine
///
/// ```text
/// pending → completed
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE review_status AS ENUM ('pending', 'completed');
///
/// CREATE TABLE reviews (
///     id UUID PRIMARY KEY,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     employee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     manager_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     module_id INTEGER NOT NULL CHECK (module_id BETWEEN 1 AND 10),
///     title VARCHAR(200) NOT NULL,
///     description VARCHAR(1000) NOT NULL,
///     feedback VARCHAR(500),
///     status review_status NOT NULL DEFAULT 'pending',
///     score INTEGER CHECK (score BETWEEN 0 AND 100),
///     submission_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::task::{checked_optional_text, checked_text, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use super::DomainError;
use crate::scoring::{is_valid_module_id, is_valid_score, MAX_MODULE_ID, MAX_SCORE, MIN_MODULE_ID, MIN_SCORE};

/// Maximum feedback length
pub const MAX_FEEDBACK_LEN: usize = 500;

/// Review status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Completed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Completed => "completed",
        }
    }
}

/// Review record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub task_id: Uuid,

    /// Employee who self-assesses
    pub employee_id: Uuid,

    /// Manager who assigned the review
    pub manager_id: Uuid,

    /// Module the review covers (1..=10)
    pub module_id: i32,

    pub title: String,
    pub description: String,
    pub feedback: Option<String>,
    pub status: ReviewStatus,

    /// Self-assessed score (0..=100), set on submission
    pub score: Option<i32>,

    pub submission_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a review
#[derive(Debug, Clone)]
pub struct CreateReview {
    pub task_id: Uuid,
    pub employee_id: Uuid,
    pub manager_id: Uuid,
    pub module_id: i32,
    pub title: String,
    pub description: String,
}

fn check_module_id(module_id: i32) -> Result<(), DomainError> {
    if is_valid_module_id(module_id) {
        Ok(())
    } else {
        Err(DomainError::invalid(
            "module_id",
            format!("Module ID must be between {} and {}", MIN_MODULE_ID, MAX_MODULE_ID),
        ))
    }
}

impl CreateReview {
    /// Checks the input and builds a pending review
    pub fn into_review(self, now: DateTime<Utc>) -> Result<Review, DomainError> {
        check_module_id(self.module_id)?;
        let title = checked_text("title", &self.title, MAX_TITLE_LEN)?;
        let description = checked_text("description", &self.description, MAX_DESCRIPTION_LEN)?;

        Ok(Review {
            id: Uuid::new_v4(),
            task_id: self.task_id,
            employee_id: self.employee_id,
            manager_id: self.manager_id,
            module_id: self.module_id,
            title,
            description,
            feedback: None,
            status: ReviewStatus::Pending,
            score: None,
            submission_date: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Manager edits to a review
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub module_id: Option<i32>,
}

/// Filter for review listings
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        self.employee_id.map_or(true, |id| review.employee_id == id)
            && self.status.map_or(true, |status| review.status == status)
    }
}

impl Review {
    /// Applies manager edits; completed reviews are frozen
    pub fn apply_changes(&mut self, changes: ReviewChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == ReviewStatus::Completed {
            return Err(DomainError::AlreadyCompleted("Review"));
        }
        if let Some(module_id) = changes.module_id {
            check_module_id(module_id)?;
        }
        let title = changes
            .title
            .map(|t| checked_text("title", &t, MAX_TITLE_LEN))
            .transpose()?;
        let description = changes
            .description
            .map(|d| checked_text("description", &d, MAX_DESCRIPTION_LEN))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(module_id) = changes.module_id {
            self.module_id = module_id;
        }

        self.before_write(now);
        Ok(())
    }

    /// Completes the review with the employee's feedback and score
    ///
    /// A missing score counts as 0, missing feedback as "".
    ///
    /// Returns the recorded score.
    ///
    /// # Errors
    ///
    /// - `DomainError::AlreadyCompleted` if the review was already submitted
    /// - `DomainError::Invalid` if the score or feedback is out of range
    pub fn submit(
        &mut self,
        feedback: Option<String>,
        score: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<i32, DomainError> {
        if self.status == ReviewStatus::Completed {
            return Err(DomainError::AlreadyCompleted("Review"));
        }
        let score = score.unwrap_or(0);
        if !is_valid_score(score) {
            return Err(DomainError::invalid(
                "score",
                format!("Score must be between {} and {}", MIN_SCORE, MAX_SCORE),
            ));
        }
        let feedback = checked_optional_text("feedback", feedback, MAX_FEEDBACK_LEN)?;

        self.status = ReviewStatus::Completed;
        self.feedback = Some(feedback);
        self.score = Some(score);
        self.submission_date = Some(now);
        self.before_write(now);
        Ok(score)
    }

    /// Pre-write transform: refresh `updated_at` and stamp the first completion
    pub fn before_write(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.status == ReviewStatus::Completed && self.submission_date.is_none() {
            self.submission_date = Some(now);
        }
    }

    pub async fn insert(pool: &PgPool, review: &Review) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, task_id, employee_id, manager_id, module_id, title, description,
                                 feedback, status, score, submission_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(review.id)
        .bind(review.task_id)
        .bind(review.employee_id)
        .bind(review.manager_id)
        .bind(review.module_id)
        .bind(&review.title)
        .bind(&review.description)
        .bind(&review.feedback)
        .bind(review.status)
        .bind(review.score)
        .bind(review.submission_date)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Reads the current status and locks the row until the transaction ends
    pub async fn status_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<ReviewStatus>, sqlx::Error> {
        sqlx::query_scalar::<_, ReviewStatus>("SELECT status FROM reviews WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists reviews matching `filter`, newest first
    pub async fn list(pool: &PgPool, filter: ReviewFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE ($1::uuid IS NULL OR employee_id = $1)
              AND ($2::review_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.employee_id)
        .bind(filter.status)
        .fetch_all(pool)
        .await
    }

    /// Writes a manager's edits to a pending review
    ///
    /// Returns `None` if the review is gone or already completed.
    pub async fn save_details(pool: &PgPool, review: &Review) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET module_id = $2,
                title = $3,
                description = $4,
                updated_at = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(review.id)
        .bind(review.module_id)
        .bind(&review.title)
        .bind(&review.description)
        .bind(review.updated_at)
        .fetch_optional(pool)
        .await
    }

    /// Writes the employee's submission to a pending review
    ///
    /// Returns false if the review is gone or already completed.
    pub async fn save_completion<'e, E: PgExecutor<'e>>(
        executor: E,
        review: &Review,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET feedback = $2,
                status = $3,
                score = $4,
                submission_date = $5,
                updated_at = $6
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(review.id)
        .bind(&review.feedback)
        .bind(review.status)
        .bind(review.score)
        .bind(review.submission_date)
        .bind(review.updated_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
