/// Response views with populated references
///
/// Tasks and reviews store bare IDs. Responses replace them with small
/// reference objects, loaded in one batch per list:
///
/// - users as `{id, username, email}`
/// - a review's task as `{id, title, description}`
///
/// A reference whose record is gone serializes as `null`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use taskreview_shared::models::review::{Review, ReviewStatus};
use taskreview_shared::models::task::{Task, TaskStatus};
use taskreview_shared::models::user::UserRef;
use taskreview_shared::store::{Store, StoreError};
use uuid::Uuid;

/// Task as embedded in review responses
#[derive(Debug, Clone, Serialize)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<UserRef>,
    pub assigned_by: Option<UserRef>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub submission_notes: Option<String>,
    pub submission_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub task_id: Option<TaskRef>,
    pub employee_id: Option<UserRef>,
    pub manager_id: Option<UserRef>,
    pub module_id: i32,
    pub title: String,
    pub description: String,
    pub feedback: Option<String>,
    pub status: ReviewStatus,
    pub score: Option<i32>,
    pub submission_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

async fn user_refs(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserRef>, StoreError> {
    let ids: Vec<Uuid> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
    let users = store.find_users(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserRef::from(u))).collect())
}

/// Populates a batch of tasks, keeping their order
pub async fn task_views(store: &dyn Store, tasks: Vec<Task>) -> Result<Vec<TaskView>, StoreError> {
    let users = user_refs(store, tasks.iter().flat_map(|t| [t.assigned_to, t.assigned_by])).await?;

    Ok(tasks
        .into_iter()
        .map(|task| TaskView {
            id: task.id,
            assigned_to: users.get(&task.assigned_to).cloned(),
            assigned_by: users.get(&task.assigned_by).cloned(),
            title: task.title,
            description: task.description,
            deadline: task.deadline,
            status: task.status,
            submission_notes: task.submission_notes,
            submission_date: task.submission_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
        .collect())
}

pub async fn task_view(store: &dyn Store, task: Task) -> Result<TaskView, StoreError> {
    let mut views = task_views(store, vec![task]).await?;
    views.pop().ok_or(StoreError::NotFound("Task"))
}

/// Populates a batch of reviews, keeping their order
pub async fn review_views(store: &dyn Store, reviews: Vec<Review>) -> Result<Vec<ReviewView>, StoreError> {
    let users = user_refs(store, reviews.iter().flat_map(|r| [r.employee_id, r.manager_id])).await?;

    let task_ids: Vec<Uuid> = reviews
        .iter()
        .map(|r| r.task_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let tasks: HashMap<Uuid, TaskRef> = store
        .find_tasks(&task_ids)
        .await?
        .iter()
        .map(|t| (t.id, TaskRef::from(t)))
        .collect();

    Ok(reviews
        .into_iter()
        .map(|review| ReviewView {
            id: review.id,
            task_id: tasks.get(&review.task_id).cloned(),
            employee_id: users.get(&review.employee_id).cloned(),
            manager_id: users.get(&review.manager_id).cloned(),
            module_id: review.module_id,
            title: review.title,
            description: review.description,
            feedback: review.feedback,
            status: review.status,
            score: review.score,
            submission_date: review.submission_date,
            created_at: review.created_at,
            updated_at: review.updated_at,
        })
        .collect())
}

pub async fn review_view(store: &dyn Store, review: Review) -> Result<ReviewView, StoreError> {
    let mut views = review_views(store, vec![review]).await?;
    views.pop().ok_or(StoreError::NotFound("Review"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskreview_shared::models::review::CreateReview;
    use taskreview_shared::models::task::CreateTask;
    use taskreview_shared::models::user::{CreateUser, Role};
    use taskreview_shared::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_review_view_populates_references() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let manager = CreateUser::new("mona", "mona@example.com", "hash", Role::Manager).into_user(now);
        let employee = CreateUser::new("ed", "ed@example.com", "hash", Role::Employee).into_user(now);
        store.create_user(&manager).await.unwrap();
        store.create_user(&employee).await.unwrap();

        let task = CreateTask {
            title: "Ship it".to_string(),
            description: "Release 1.0".to_string(),
            assigned_to: employee.id,
            assigned_by: manager.id,
            deadline: None,
        }
        .into_task(now)
        .unwrap();
        store.insert_task(&task).await.unwrap();

        let review = CreateReview {
            task_id: task.id,
            employee_id: employee.id,
            manager_id: manager.id,
            module_id: 5,
            title: "Release review".to_string(),
            description: "How did it go".to_string(),
        }
        .into_review(now)
        .unwrap();

        let view = review_view(&store, review).await.unwrap();
        assert_eq!(view.task_id.unwrap().title, "Ship it");
        assert_eq!(view.employee_id.unwrap().username, "ed");
        assert_eq!(view.manager_id.unwrap().email, "mona@example.com");

        let json = serde_json::to_value(task_view(&store, task).await.unwrap()).unwrap();
        assert_eq!(json["assigned_to"]["username"], "ed");
        assert!(json["assigned_to"].get("password_hash").is_none());
    }
}
