/// User model and database operations
///
/// Users are either managers or employees. Each user carries an ordered list
/// of module scores, one per skill module, which reviews update over time.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('employee', 'manager');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     username VARCHAR(100) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'employee',
///     modules_scores JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskreview_shared::models::user::{CreateUser, Role, User};
/// use taskreview_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = CreateUser::new("jdoe", "jdoe@example.com", "$argon2id$...", Role::Employee)
///     .into_user(chrono::Utc::now());
/// User::insert(&pool, &user).await?;
///
/// let found = User::find_by_email(&pool, "jdoe@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor, PgPool};
use std::fmt;
use uuid::Uuid;

use crate::scoring::{initial_module_scores, ModuleScore};

/// Role of a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Receives tasks and reviews, submits them
    #[default]
    Employee,

    /// Creates, edits and deletes tasks and reviews
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Unique email address, stored lowercase
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role
    pub role: Role,

    /// Per-module scores, in stored order
    pub modules_scores: Vec<ModuleScore>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last written
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `users` table
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    modules_scores: Json<Vec<ModuleScore>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            modules_scores: row.modules_scores.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Argon2id hash, never the plaintext password
    pub password_hash: String,
    pub role: Role,
}

impl CreateUser {
    /// Builds the input, trimming the username and normalizing the email
    pub fn new(
        username: impl Into<String>,
        email: impl AsRef<str>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            username: username.into().trim().to_string(),
            email: normalize_email(email.as_ref()),
            password_hash: password_hash.into(),
            role,
        }
    }

    /// Materializes the user record with a fresh ID and zeroed module scores
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            modules_scores: initial_module_scores(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Changes applied to an existing user
///
/// Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// Lowercases and trims an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reference to a user as embedded in task and review responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, modules_scores, created_at, updated_at";

impl User {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Applies `changes` and refreshes `updated_at`
    pub fn apply_update(&mut self, changes: UpdateUser, now: DateTime<Utc>) {
        if let Some(username) = changes.username {
            self.username = username.trim().to_string();
        }
        if let Some(email) = changes.email {
            self.email = normalize_email(&email);
        }
        if let Some(password_hash) = changes.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
        self.updated_at = now;
    }

    /// Inserts a materialized user record
    ///
    /// # Errors
    ///
    /// Fails on a duplicate username or email (unique constraint violation)
    pub async fn insert(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, modules_scores, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(Json(&user.modules_scores))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(User::from))
    }

    /// Finds a user by ID and locks the row until the transaction ends
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(User::from))
    }

    /// Finds a user by email (normalized before lookup)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Fetches every user whose ID is in `ids`
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Lists users, newest first, optionally restricted to one role
    pub async fn list(pool: &PgPool, role: Option<Role>) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(role)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Writes the account fields of `user` and returns the stored record
    ///
    /// `modules_scores` is left alone; only [`User::save_scores`] writes it.
    /// Returns `None` if the user no longer exists.
    pub async fn save_account<'e, E: PgExecutor<'e>>(
        executor: E,
        user: &User,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.updated_at)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(User::from))
    }

    /// Overwrites the module scores of one user
    pub async fn save_scores<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        scores: &[ModuleScore],
        updated_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET modules_scores = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(Json(scores))
            .bind(updated_at)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user; tasks and reviews referencing it cascade
    ///
    /// Returns false if the user didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
