/// Task model and database operations
///
/// A task is a unit of work a manager assigns to an employee. The employee
/// submits it once, with optional notes.
///
/// # State Machine
///
/// ```text
/// pending → in_review → completed
/// pending ────────────→ completed
/// ```
///
/// `in_review` is only reachable through a manager's manual update. Once a
/// task is completed it cannot be submitted again, and `submission_date` is
/// stamped the first time the status becomes `completed`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_review', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description VARCHAR(1000) NOT NULL,
///     assigned_to UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assigned_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     deadline TIMESTAMPTZ,
///     status task_status NOT NULL DEFAULT 'pending',
///     submission_notes VARCHAR(500),
///     submission_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::DomainError;

/// Maximum title length
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum description length
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Maximum submission notes length
pub const MAX_NOTES_LEN: usize = 500;

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Assigned, not yet worked on
    #[default]
    Pending,

    /// Set by a manager while checking the work
    InReview,

    /// Submitted by the assignee
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InReview => "in_review",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,

    /// Employee the task is assigned to
    pub assigned_to: Uuid,

    /// Manager who created the task
    pub assigned_by: Uuid,

    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub submission_notes: Option<String>,

    /// Set once, when the task first becomes completed
    pub submission_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub assigned_to: Uuid,
    pub assigned_by: Uuid,
    pub deadline: Option<DateTime<Utc>>,
}

impl CreateTask {
    /// Checks the input and builds a pending task
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` if a text field is blank or too long,
    /// or if the deadline is not in the future.
    pub fn into_task(self, now: DateTime<Utc>) -> Result<Task, DomainError> {
        let title = checked_text("title", &self.title, MAX_TITLE_LEN)?;
        let description = checked_text("description", &self.description, MAX_DESCRIPTION_LEN)?;
        check_deadline(self.deadline, now)?;

        Ok(Task {
            id: Uuid::new_v4(),
            title,
            description,
            assigned_to: self.assigned_to,
            assigned_by: self.assigned_by,
            deadline: self.deadline,
            status: TaskStatus::Pending,
            submission_notes: None,
            submission_date: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Manager edits to a task
///
/// Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
}

/// Filter for task listings
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    /// Only tasks assigned to this user
    pub assigned_to: Option<Uuid>,

    /// Only tasks in this status
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.assigned_to.map_or(true, |id| task.assigned_to == id)
            && self.status.map_or(true, |status| task.status == status)
    }
}

/// Trims `value` and checks it is non-empty and at most `max` characters
pub(crate) fn checked_text(field: &'static str, value: &str, max: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(field, format!("{} is required", field)));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::invalid(
            field,
            format!("{} cannot be more than {} characters", field, max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims optional free text and checks its length; missing text becomes ""
pub(crate) fn checked_optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<String, DomainError> {
    let text = value.unwrap_or_default().trim().to_string();
    if text.chars().count() > max {
        return Err(DomainError::invalid(
            field,
            format!("{} cannot be more than {} characters", field, max),
        ));
    }
    Ok(text)
}

fn check_deadline(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), DomainError> {
    match deadline {
        Some(deadline) if deadline <= now => {
            Err(DomainError::invalid("deadline", "Deadline must be in the future"))
        }
        _ => Ok(()),
    }
}

impl Task {
    /// Applies manager edits
    ///
    /// A new deadline must lie in the future. Setting the status to
    /// `completed` stamps `submission_date` if it is still empty; a completed
    /// task cannot be moved back.
    pub fn apply_changes(&mut self, changes: TaskChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        // Validate everything before touching the record
        let title = changes
            .title
            .map(|t| checked_text("title", &t, MAX_TITLE_LEN))
            .transpose()?;
        let description = changes
            .description
            .map(|d| checked_text("description", &d, MAX_DESCRIPTION_LEN))
            .transpose()?;
        if changes.deadline.is_some() {
            check_deadline(changes.deadline, now)?;
        }
        if self.status == TaskStatus::Completed && changes.status.is_some_and(|s| s != TaskStatus::Completed) {
            return Err(DomainError::AlreadyCompleted("Task"));
        }

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(assigned_to) = changes.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(deadline) = changes.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }

        self.before_write(now);
        Ok(())
    }

    /// Marks the task completed on behalf of its assignee
    ///
    /// # Errors
    ///
    /// `DomainError::AlreadyCompleted` if the task was already completed; the
    /// record is left untouched.
    pub fn submit(&mut self, notes: Option<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == TaskStatus::Completed {
            return Err(DomainError::AlreadyCompleted("Task"));
        }
        let notes = checked_optional_text("submission_notes", notes, MAX_NOTES_LEN)?;

        self.status = TaskStatus::Completed;
        self.submission_notes = Some(notes);
        self.submission_date = Some(now);
        self.before_write(now);
        Ok(())
    }

    /// Pre-write transform: refresh `updated_at` and stamp the first completion
    pub fn before_write(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.status == TaskStatus::Completed && self.submission_date.is_none() {
            self.submission_date = Some(now);
        }
    }

    pub async fn insert(pool: &PgPool, task: &Task) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, assigned_to, assigned_by, deadline, status,
                               submission_notes, submission_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.assigned_to)
        .bind(task.assigned_by)
        .bind(task.deadline)
        .bind(task.status)
        .bind(&task.submission_notes)
        .bind(task.submission_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Lists tasks matching `filter`, newest first
    pub async fn list(pool: &PgPool, filter: TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE ($1::uuid IS NULL OR assigned_to = $1)
              AND ($2::task_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.assigned_to)
        .bind(filter.status)
        .fetch_all(pool)
        .await
    }

    /// Most recently submitted completed tasks of one employee
    pub async fn recent_completed(
        pool: &PgPool,
        assigned_to: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE assigned_to = $1 AND status = 'completed'
            ORDER BY submission_date DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(assigned_to)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Writes a manager's edits and returns the stored task
    ///
    /// Submission notes are never touched here. A completed task stays
    /// completed and keeps its first `submission_date`, whatever the edit
    /// was read from. Returns `None` if the task is gone.
    pub async fn save_details(pool: &PgPool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                assigned_to = $4,
                deadline = $5,
                status = CASE WHEN status = 'completed' THEN status ELSE $6 END,
                submission_date = COALESCE(submission_date, $7),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.assigned_to)
        .bind(task.deadline)
        .bind(task.status)
        .bind(task.submission_date)
        .bind(task.updated_at)
        .fetch_optional(pool)
        .await
    }

    /// Writes the assignee's submission unless the task is already completed
    ///
    /// Returns false if the task is gone or was completed in the meantime.
    pub async fn save_submission(pool: &PgPool, task: &Task) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2,
                submission_notes = $3,
                submission_date = $4,
                updated_at = $5
            WHERE id = $1 AND status <> 'completed'
            "#,
        )
        .bind(task.id)
        .bind(task.status)
        .bind(&task.submission_notes)
        .bind(task.submission_date)
        .bind(task.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-deletes a task; its reviews cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
