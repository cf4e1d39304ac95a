/// Review endpoints
///
/// # Endpoints
///
/// - `GET /reviews?status=` - List reviews (employees see their own)
/// - `POST /reviews` - Create a review (manager)
/// - `GET /reviews/:id` - Get a review
/// - `PUT /reviews/:id` - Edit a review (creating manager)
/// - `DELETE /reviews/:id` - Delete a review (creating manager)
/// - `POST /reviews/:id/submit` - Complete a review (assigned employee)
/// - `GET /reviews/suggestions/:employee_id` - Next module to review (manager)
/// - `GET /reviews/employee/:employee_id` - One employee's reviews (manager)
///
/// Submitting a review blends its score into the employee's module scores;
/// see [`taskreview_shared::scoring`].

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, OptionalJson, Path, Query},
    response::ApiResponse,
    routes::found,
    views::{review_view, review_views, ReviewView},
};
use axum::{extract::State, Extension};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskreview_shared::{
    auth::{
        authorization::{ensure_assignee, ensure_can_view, ensure_owner, list_scope, require_role},
        middleware::AuthContext,
    },
    models::{
        review::{CreateReview, ReviewChanges, ReviewFilter, ReviewStatus},
        task::Task,
        user::Role,
    },
    scoring::{suggest_next_module, ModuleScore},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Completed tasks shown alongside a suggestion
const RECENT_COMPLETED_LIMIT: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub task_id: Uuid,
    pub employee_id: Uuid,

    #[validate(range(min = 1, max = 10, message = "Module ID must be between 1 and 10"))]
    pub module_id: i32,

    #[serde(default)]
    #[validate(length(max = 200, message = "Title cannot be more than 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(max = 200, message = "Title cannot be more than 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description cannot be more than 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Module ID must be between 1 and 10"))]
    pub module_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubmitReviewRequest {
    #[validate(length(max = 500, message = "Feedback cannot be more than 500 characters"))]
    pub feedback: Option<String>,

    /// Missing counts as 0
    #[validate(range(min = 0, max = 100, message = "Score must be between 0 and 100"))]
    pub score: Option<i32>,
}

/// Suggestion payload
#[derive(Debug, Serialize)]
pub struct Suggestion {
    /// Lowest-scoring module, earliest on ties
    pub suggested_module: Option<i32>,
    pub employee_scores: Vec<ModuleScore>,
    pub recent_completed_tasks: Vec<Task>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReviewListQuery>,
) -> ApiResult<ApiResponse<Vec<ReviewView>>> {
    let filter = ReviewFilter {
        employee_id: list_scope(&auth),
        status: query.status,
    };

    let reviews = state.store.list_reviews(filter).await?;
    Ok(ApiResponse::list(review_views(state.store.as_ref(), reviews).await?))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<ApiResponse<ReviewView>> {
    require_role(&auth, Role::Manager)?;
    req.validate()?;

    let task = state.store.find_task(req.task_id).await?;
    let employee = state.store.find_user(req.employee_id).await?;
    match (task, employee) {
        (Some(_), Some(employee)) if employee.is_employee() => {}
        _ => return Err(ApiError::NotFound("Invalid task or employee".to_string())),
    }

    let review = CreateReview {
        task_id: req.task_id,
        employee_id: req.employee_id,
        manager_id: auth.user_id,
        module_id: req.module_id,
        title: req.title,
        description: req.description,
    }
    .into_review(Utc::now())?;

    state.store.insert_review(&review).await?;
    info!(review_id = %review.id, employee_id = %review.employee_id, module_id = review.module_id, "Review created");

    let view = review_view(state.store.as_ref(), review).await?;
    Ok(ApiResponse::created(view).with_message("Review created successfully"))
}

pub async fn get_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<ReviewView>> {
    let review = found(state.store.find_review(id).await?, "Review not found")?;
    ensure_can_view(&auth, &review)?;

    Ok(ApiResponse::ok(review_view(state.store.as_ref(), review).await?))
}

pub async fn update_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<ApiResponse<ReviewView>> {
    require_role(&auth, Role::Manager)?;
    req.validate()?;

    let mut review = found(state.store.find_review(id).await?, "Review not found")?;
    ensure_owner(&auth, &review)?;

    review.apply_changes(
        ReviewChanges {
            title: req.title,
            description: req.description,
            module_id: req.module_id,
        },
        Utc::now(),
    )?;
    let review = state.store.update_review(&review).await?;

    let view = review_view(state.store.as_ref(), review).await?;
    Ok(ApiResponse::ok(view).with_message("Review updated successfully"))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_role(&auth, Role::Manager)?;

    let review = found(state.store.find_review(id).await?, "Review not found")?;
    ensure_owner(&auth, &review)?;

    if !state.store.delete_review(id).await? {
        return Err(ApiError::NotFound("Review not found".to_string()));
    }
    info!(review_id = %id, "Review deleted");

    Ok(ApiResponse::message("Review deleted successfully"))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    OptionalJson(req): OptionalJson<SubmitReviewRequest>,
) -> ApiResult<ApiResponse<ReviewView>> {
    require_role(&auth, Role::Employee)?;
    req.validate()?;

    let mut review = found(state.store.find_review(id).await?, "Review not found")?;
    ensure_assignee(&auth, &review)?;

    let score = review.submit(req.feedback, req.score, Utc::now())?;
    let employee = state.store.complete_review(&review).await?;
    info!(
        review_id = %review.id,
        employee_id = %employee.id,
        module_id = review.module_id,
        score,
        "Review submitted"
    );

    let view = review_view(state.store.as_ref(), review).await?;
    Ok(ApiResponse::ok(view).with_message("Review submitted successfully"))
}

pub async fn suggestions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Suggestion>> {
    require_role(&auth, Role::Manager)?;

    let employee = state
        .store
        .find_user(employee_id)
        .await?
        .filter(|user| user.is_employee());
    let employee = found(employee, "Employee not found")?;

    let recent_completed_tasks = state
        .store
        .recent_completed_tasks(employee.id, RECENT_COMPLETED_LIMIT)
        .await?;

    Ok(ApiResponse::ok(Suggestion {
        suggested_module: suggest_next_module(&employee.modules_scores),
        employee_scores: employee.modules_scores,
        recent_completed_tasks,
    }))
}

pub async fn employee_reviews(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<ReviewView>>> {
    require_role(&auth, Role::Manager)?;

    let reviews = state
        .store
        .list_reviews(ReviewFilter {
            employee_id: Some(employee_id),
            status: None,
        })
        .await?;

    Ok(ApiResponse::list(review_views(state.store.as_ref(), reviews).await?))
}
