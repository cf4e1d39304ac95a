/// Authorization policy
///
/// Two roles, checked on every request against the caller's current record:
///
/// - **Managers** create, edit and delete tasks and reviews, and see
///   everything. Edits and deletes are limited to the manager who created
///   the record.
/// - **Employees** see only what is assigned to them and may submit it.
///
/// Tasks and reviews share the same shape for these checks through the
/// [`Assignment`] trait.
///
/// # Example
///
/// ```
/// use taskreview_shared::auth::authorization::{ensure_can_view, require_role};
/// use taskreview_shared::auth::middleware::AuthContext;
/// use taskreview_shared::models::task::CreateTask;
/// use taskreview_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let employee = AuthContext { user_id: Uuid::new_v4(), username: "eve".into(), role: Role::Employee };
/// let task = CreateTask {
///     title: "t".into(),
///     description: "d".into(),
///     assigned_to: Uuid::new_v4(),
///     assigned_by: Uuid::new_v4(),
///     deadline: None,
/// }
/// .into_task(chrono::Utc::now())
/// .unwrap();
///
/// assert!(require_role(&employee, Role::Manager).is_err());
/// assert!(ensure_can_view(&employee, &task).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::review::Review;
use crate::models::task::Task;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not allowed on this route
    #[error("Role {actual} is not authorized to access this route")]
    InsufficientRole { required: Role, actual: Role },

    /// Caller is not the employee the record is assigned to
    #[error("Not authorized to access this {0}")]
    NotAssignee(&'static str),

    /// Caller is not the manager who created the record
    #[error("Only the creating manager may modify this {0}")]
    NotOwner(&'static str),

    /// Caller may not access another user's account
    #[error("Not authorized to access this user")]
    NotSelf,
}

/// A record assigned by a manager to an employee
pub trait Assignment {
    /// Name used in error messages
    const KIND: &'static str;

    /// Employee the record is assigned to
    fn assignee(&self) -> Uuid;

    /// Manager who created the record
    fn owner(&self) -> Uuid;
}

impl Assignment for Task {
    const KIND: &'static str = "task";

    fn assignee(&self) -> Uuid {
        self.assigned_to
    }

    fn owner(&self) -> Uuid {
        self.assigned_by
    }
}

impl Assignment for Review {
    const KIND: &'static str = "review";

    fn assignee(&self) -> Uuid {
        self.employee_id
    }

    fn owner(&self) -> Uuid {
        self.manager_id
    }
}

/// Requires the caller to hold `required`
pub fn require_role(auth: &AuthContext, required: Role) -> Result<(), AuthzError> {
    if auth.role != required {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }
    Ok(())
}

/// Restricts list reads: employees see their own records, managers all
///
/// Returns the assignee to filter on, if any.
pub fn list_scope(auth: &AuthContext) -> Option<Uuid> {
    match auth.role {
        Role::Employee => Some(auth.user_id),
        Role::Manager => None,
    }
}

/// Managers may view any record; employees only their own
pub fn ensure_can_view<A: Assignment>(auth: &AuthContext, record: &A) -> Result<(), AuthzError> {
    if auth.role == Role::Employee && record.assignee() != auth.user_id {
        return Err(AuthzError::NotAssignee(A::KIND));
    }
    Ok(())
}

/// Only the assigned employee may submit a record
pub fn ensure_assignee<A: Assignment>(auth: &AuthContext, record: &A) -> Result<(), AuthzError> {
    require_role(auth, Role::Employee)?;
    if record.assignee() != auth.user_id {
        return Err(AuthzError::NotAssignee(A::KIND));
    }
    Ok(())
}

/// Only the creating manager may edit or delete a record
pub fn ensure_owner<A: Assignment>(auth: &AuthContext, record: &A) -> Result<(), AuthzError> {
    require_role(auth, Role::Manager)?;
    if record.owner() != auth.user_id {
        return Err(AuthzError::NotOwner(A::KIND));
    }
    Ok(())
}

/// Managers may access any account; everyone else only their own
pub fn ensure_self_or_manager(auth: &AuthContext, user_id: Uuid) -> Result<(), AuthzError> {
    if auth.role == Role::Manager || auth.user_id == user_id {
        Ok(())
    } else {
        Err(AuthzError::NotSelf)
    }
}
