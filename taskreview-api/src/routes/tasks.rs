/// Task endpoints
///
/// # Endpoints
///
/// - `GET /tasks?status=` - List tasks (employees see their own)
/// - `POST /tasks` - Create a task (manager)
/// - `GET /tasks/:id` - Get a task
/// - `PUT /tasks/:id` - Edit a task (creating manager)
/// - `DELETE /tasks/:id` - Delete a task and its reviews (creating manager)
/// - `POST /tasks/:id/submit` - Complete a task (assigned employee)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, OptionalJson, Path, Query},
    response::ApiResponse,
    routes::found,
    views::{task_view, task_views, TaskView},
};
use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskreview_shared::{
    auth::{
        authorization::{ensure_assignee, ensure_can_view, ensure_owner, list_scope, require_role},
        middleware::AuthContext,
    },
    models::{
        task::{CreateTask, TaskChanges, TaskFilter, TaskStatus},
        user::Role,
    },
    store::Store,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title cannot be more than 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: String,

    pub assigned_to: Uuid,

    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title cannot be more than 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: Option<String>,

    pub assigned_to: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubmitTaskRequest {
    #[validate(length(max = 500, message = "Submission notes cannot be more than 500 characters"))]
    pub submission_notes: Option<String>,
}

/// Checks that `user_id` names an employee who can receive tasks
async fn ensure_assignable(store: &dyn Store, user_id: Uuid) -> ApiResult<()> {
    let user = found(store.find_user(user_id).await?, "Assigned user not found")?;
    if user.role != Role::Employee {
        return Err(ApiError::BadRequest("Only employees can be assigned tasks".to_string()));
    }
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<ApiResponse<Vec<TaskView>>> {
    let filter = TaskFilter {
        assigned_to: list_scope(&auth),
        status: query.status,
    };

    let tasks = state.store.list_tasks(filter).await?;
    Ok(ApiResponse::list(task_views(state.store.as_ref(), tasks).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskView>> {
    require_role(&auth, Role::Manager)?;
    req.validate()?;
    ensure_assignable(state.store.as_ref(), req.assigned_to).await?;

    let task = CreateTask {
        title: req.title,
        description: req.description,
        assigned_to: req.assigned_to,
        assigned_by: auth.user_id,
        deadline: req.deadline,
    }
    .into_task(Utc::now())?;

    state.store.insert_task(&task).await?;
    info!(task_id = %task.id, assigned_to = %task.assigned_to, "Task created");

    let view = task_view(state.store.as_ref(), task).await?;
    Ok(ApiResponse::created(view).with_message("Task created successfully"))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<TaskView>> {
    let task = found(state.store.find_task(id).await?, "Task not found")?;
    ensure_can_view(&auth, &task)?;

    Ok(ApiResponse::ok(task_view(state.store.as_ref(), task).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskView>> {
    require_role(&auth, Role::Manager)?;
    req.validate()?;

    let mut task = found(state.store.find_task(id).await?, "Task not found")?;
    ensure_owner(&auth, &task)?;

    if let Some(assigned_to) = req.assigned_to {
        ensure_assignable(state.store.as_ref(), assigned_to).await?;
    }

    task.apply_changes(
        TaskChanges {
            title: req.title,
            description: req.description,
            assigned_to: req.assigned_to,
            deadline: req.deadline,
            status: req.status,
        },
        Utc::now(),
    )?;
    let task = state.store.update_task(&task).await?;

    let view = task_view(state.store.as_ref(), task).await?;
    Ok(ApiResponse::ok(view).with_message("Task updated successfully"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_role(&auth, Role::Manager)?;

    let task = found(state.store.find_task(id).await?, "Task not found")?;
    ensure_owner(&auth, &task)?;

    if !state.store.delete_task(id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    info!(task_id = %id, "Task deleted");

    Ok(ApiResponse::message("Task deleted successfully"))
}

pub async fn submit_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    OptionalJson(req): OptionalJson<SubmitTaskRequest>,
) -> ApiResult<ApiResponse<TaskView>> {
    require_role(&auth, Role::Employee)?;
    req.validate()?;

    let mut task = found(state.store.find_task(id).await?, "Task not found")?;
    ensure_assignee(&auth, &task)?;

    task.submit(req.submission_notes, Utc::now())?;
    state.store.submit_task(&task).await?;
    info!(task_id = %task.id, employee_id = %auth.user_id, "Task submitted");

    let view = task_view(state.store.as_ref(), task).await?;
    Ok(ApiResponse::ok(view).with_message("Task submitted successfully"))
}
