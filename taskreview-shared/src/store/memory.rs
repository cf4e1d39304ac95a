/// In-memory store
///
/// Keeps every record in `HashMap`s behind a single `tokio::sync::RwLock`.
/// Used by the API tests and by `STORE_BACKEND=memory` for local runs; data
/// is lost on restart.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::review::{Review, ReviewFilter, ReviewStatus};
use crate::models::task::{Task, TaskFilter, TaskStatus};
use crate::models::user::{normalize_email, Role, User};
use crate::models::DomainError;
use crate::scoring::apply_submitted_score;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    reviews: HashMap<Uuid, Review>,
}

impl Tables {
    /// Rejects a username or email already held by another user
    fn check_unique(&self, user: &User) -> Result<(), StoreError> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.email == normalize_email(&user.email) {
                return Err(StoreError::Conflict("Email is already registered".to_string()));
            }
            if other.username == user.username {
                return Err(StoreError::Conflict("Username is already taken".to_string()));
            }
        }
        Ok(())
    }

    fn remove_task(&mut self, id: Uuid) -> bool {
        self.reviews.retain(|_, review| review.task_id != id);
        self.tasks.remove(&id).is_some()
    }
}

/// Sorts newest first
fn newest_first<T>(mut records: Vec<T>, created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    records.sort_by_key(|r| Reverse(created_at(r)));
    records
}

/// Store keeping everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(user)?;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id)).cloned().collect())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let users = tables
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        Ok(newest_first(users, |u: &User| u.created_at))
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound("User"));
        }
        tables.check_unique(user)?;

        let stored = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound("User"))?;
        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.role = user.role;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned_tasks: Vec<Uuid> = tables
            .tasks
            .values()
            .filter(|t| t.assigned_to == id || t.assigned_by == id)
            .map(|t| t.id)
            .collect();
        for task_id in owned_tasks {
            tables.remove_task(task_id);
        }
        tables
            .reviews
            .retain(|_, r| r.employee_id != id && r.manager_id != id);

        Ok(true)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tables.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn find_tasks(&self, ids: &[Uuid]) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.tasks.get(id)).cloned().collect())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let tasks = tables.tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        Ok(newest_first(tasks, |t: &Task| t.created_at))
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.tasks.get_mut(&task.id).ok_or(StoreError::NotFound("Task"))?;

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.assigned_to = task.assigned_to;
        stored.deadline = task.deadline;
        if stored.status != TaskStatus::Completed {
            stored.status = task.status;
        }
        stored.submission_date = stored.submission_date.or(task.submission_date);
        stored.updated_at = task.updated_at;
        Ok(stored.clone())
    }

    async fn submit_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.tasks.get_mut(&task.id).ok_or(StoreError::NotFound("Task"))?;
        if stored.status == TaskStatus::Completed {
            return Err(DomainError::AlreadyCompleted("Task").into());
        }

        stored.status = task.status;
        stored.submission_notes = task.submission_notes.clone();
        stored.submission_date = task.submission_date;
        stored.updated_at = task.updated_at;
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.remove_task(id))
    }

    async fn recent_completed_tasks(&self, employee_id: Uuid, limit: usize) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.assigned_to == employee_id && t.status == TaskStatus::Completed)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| Reverse(t.submission_date));
        tasks.truncate(limit);
        Ok(tasks)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        self.tables.write().await.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let tables = self.tables.read().await;
        let reviews = tables.reviews.values().filter(|r| filter.matches(r)).cloned().collect();
        Ok(newest_first(reviews, |r: &Review| r.created_at))
    }

    async fn update_review(&self, review: &Review) -> Result<Review, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.reviews.get_mut(&review.id).ok_or(StoreError::NotFound("Review"))?;
        if stored.status == ReviewStatus::Completed {
            return Err(DomainError::AlreadyCompleted("Review").into());
        }

        stored.module_id = review.module_id;
        stored.title = review.title.clone();
        stored.description = review.description.clone();
        stored.updated_at = review.updated_at;
        Ok(stored.clone())
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }

    async fn complete_review(&self, review: &Review) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        match tables.reviews.get(&review.id) {
            None => return Err(StoreError::NotFound("Review")),
            Some(stored) if stored.status == ReviewStatus::Completed => {
                return Err(DomainError::AlreadyCompleted("Review").into());
            }
            Some(_) => {}
        }

        let employee = tables
            .users
            .get_mut(&review.employee_id)
            .ok_or(StoreError::NotFound("User"))?;
        apply_submitted_score(&mut employee.modules_scores, review.module_id, review.score.unwrap_or(0));
        employee.updated_at = review.updated_at;
        let employee = employee.clone();

        tables.reviews.insert(review.id, review.clone());
        Ok(employee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::CreateReview;
    use crate::models::task::CreateTask;
    use crate::models::user::CreateUser;
    use chrono::{Duration, Utc};

    async fn seed_user(store: &MemoryStore, name: &str, role: Role) -> User {
        let user = CreateUser::new(name, format!("{}@example.com", name), "hash", role).into_user(Utc::now());
        store.create_user(&user).await.unwrap();
        user
    }

    async fn seed_task(store: &MemoryStore, manager: &User, employee: &User) -> Task {
        let task = CreateTask {
            title: "Task".to_string(),
            description: "Description".to_string(),
            assigned_to: employee.id,
            assigned_by: manager.id,
            deadline: None,
        }
        .into_task(Utc::now())
        .unwrap();
        store.insert_task(&task).await.unwrap();
        task
    }

    async fn seed_review(store: &MemoryStore, task: &Task, module_id: i32) -> Review {
        let review = CreateReview {
            task_id: task.id,
            employee_id: task.assigned_to,
            manager_id: task.assigned_by,
            module_id,
            title: "Review".to_string(),
            description: "Assess".to_string(),
        }
        .into_review(Utc::now())
        .unwrap();
        store.insert_review(&review).await.unwrap();
        review
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() {
        let store = MemoryStore::new();
        seed_user(&store, "dana", Role::Employee).await;

        let same_email = CreateUser::new("other", "DANA@example.com", "hash", Role::Employee).into_user(Utc::now());
        assert!(matches!(store.create_user(&same_email).await, Err(StoreError::Conflict(_))));

        let same_name = CreateUser::new("dana", "dana2@example.com", "hash", Role::Employee).into_user(Utc::now());
        assert!(matches!(store.create_user(&same_name).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_user_keeps_own_email() {
        let store = MemoryStore::new();
        let mut user = seed_user(&store, "eli", Role::Employee).await;

        user.username = "elias".to_string();
        store.update_user(&user).await.unwrap();

        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "elias");
    }

    #[tokio::test]
    async fn test_list_users_by_role_newest_first() {
        let store = MemoryStore::new();
        let mut first = CreateUser::new("first", "first@example.com", "hash", Role::Employee).into_user(Utc::now());
        first.created_at -= Duration::minutes(5);
        store.create_user(&first).await.unwrap();
        let second = seed_user(&store, "second", Role::Employee).await;
        seed_user(&store, "boss", Role::Manager).await;

        let employees = store.list_users(Some(Role::Employee)).await.unwrap();
        let ids: Vec<Uuid> = employees.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(store.list_users(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_task_cascades_reviews() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;
        let review = seed_review(&store, &task, 3).await;

        assert!(store.delete_task(task.id).await.unwrap());
        assert!(store.find_review(review.id).await.unwrap().is_none());
        assert!(!store.delete_task(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_tasks_and_reviews() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;
        let review = seed_review(&store, &task, 3).await;

        assert!(store.delete_user(employee.id).await.unwrap());
        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert!(store.find_review(review.id).await.unwrap().is_none());
        assert!(store.find_user(manager.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recent_completed_tasks_by_submission_date() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;

        let now = Utc::now();
        let mut submitted = Vec::new();
        for minutes in 0..7 {
            let mut task = seed_task(&store, &manager, &employee).await;
            task.submit(None, now - Duration::minutes(minutes)).unwrap();
            store.submit_task(&task).await.unwrap();
            submitted.push(task.id);
        }
        seed_task(&store, &manager, &employee).await;

        let recent = store.recent_completed_tasks(employee.id, 5).await.unwrap();
        let ids: Vec<Uuid> = recent.iter().map(|t| t.id).collect();
        assert_eq!(ids, submitted[..5].to_vec());
    }

    #[tokio::test]
    async fn test_complete_review_blends_score_once() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;

        let mut first = seed_review(&store, &task, 4).await;
        first.submit(None, Some(70), Utc::now()).unwrap();
        store.complete_review(&first).await.unwrap();

        let mut second = seed_review(&store, &task, 4).await;
        second.submit(Some("ok".to_string()), Some(50), Utc::now()).unwrap();
        let updated = store.complete_review(&second).await.unwrap();

        // 0 blended with 70 gives 35, then 35 with 50 gives 43 (42.5 rounds up)
        let module = updated.modules_scores.iter().find(|m| m.module_id == 4).unwrap();
        assert_eq!(module.score, 43);
        assert_eq!(updated.modules_scores.len(), 10);

        let again = store.complete_review(&second).await;
        assert!(matches!(again, Err(StoreError::Domain(DomainError::AlreadyCompleted(_)))));
        let stored = store.find_user(employee.id).await.unwrap().unwrap();
        assert_eq!(stored.modules_scores, updated.modules_scores);
    }

    #[tokio::test]
    async fn test_stale_review_edit_cannot_undo_completion() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;
        let review = seed_review(&store, &task, 2).await;

        // Manager loaded the review before the employee submitted it
        let mut stale = review.clone();
        let mut submitted = review.clone();
        submitted.submit(Some("done".to_string()), Some(80), Utc::now()).unwrap();
        store.complete_review(&submitted).await.unwrap();

        stale.title = "Renamed".to_string();
        let err = store.update_review(&stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::AlreadyCompleted("Review"))));

        let stored = store.find_review(review.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReviewStatus::Completed);
        assert_eq!(stored.score, Some(80));
        assert_eq!(stored.title, "Review");

        assert!(store.complete_review(&submitted).await.is_err());
        let scores = store.find_user(employee.id).await.unwrap().unwrap().modules_scores;
        assert_eq!(scores.iter().find(|m| m.module_id == 2).unwrap().score, 40);
    }

    #[tokio::test]
    async fn test_update_review_writes_only_editable_fields() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;
        let review = seed_review(&store, &task, 2).await;

        let mut edit = review.clone();
        edit.module_id = 9;
        edit.title = "Renamed".to_string();
        edit.score = Some(100);
        edit.feedback = Some("forged".to_string());

        let stored = store.update_review(&edit).await.unwrap();
        assert_eq!(stored.module_id, 9);
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.status, ReviewStatus::Pending);
        assert_eq!(stored.score, None);
        assert_eq!(stored.feedback, None);
    }

    #[tokio::test]
    async fn test_stale_user_update_keeps_module_scores() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;

        let mut stale = store.find_user(employee.id).await.unwrap().unwrap();

        let mut review = seed_review(&store, &task, 6).await;
        review.submit(None, Some(90), Utc::now()).unwrap();
        let scored = store.complete_review(&review).await.unwrap();

        stale.username = "renamed".to_string();
        let updated = store.update_user(&stale).await.unwrap();

        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.modules_scores, scored.modules_scores);
        assert_eq!(updated.modules_scores.iter().find(|m| m.module_id == 6).unwrap().score, 45);
    }

    #[tokio::test]
    async fn test_second_task_submission_rejected() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;

        // Two submissions racing from the same pending snapshot
        let now = Utc::now();
        let mut first = task.clone();
        first.submit(Some("first".to_string()), now).unwrap();
        let mut second = task.clone();
        second.submit(Some("second".to_string()), now + Duration::minutes(1)).unwrap();

        store.submit_task(&first).await.unwrap();
        let err = store.submit_task(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::AlreadyCompleted("Task"))));

        let stored = store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.submission_notes.as_deref(), Some("first"));
        assert_eq!(stored.submission_date, Some(now));
    }

    #[tokio::test]
    async fn test_stale_task_edit_keeps_completion() {
        let store = MemoryStore::new();
        let manager = seed_user(&store, "manager", Role::Manager).await;
        let employee = seed_user(&store, "employee", Role::Employee).await;
        let task = seed_task(&store, &manager, &employee).await;

        let mut stale = task.clone();
        let mut submitted = task.clone();
        let submitted_at = Utc::now();
        submitted.submit(Some("notes".to_string()), submitted_at).unwrap();
        store.submit_task(&submitted).await.unwrap();

        stale.title = "Renamed".to_string();
        let stored = store.update_task(&stale).await.unwrap();

        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.submission_notes.as_deref(), Some("notes"));
        assert_eq!(stored.submission_date, Some(submitted_at));
    }
}
