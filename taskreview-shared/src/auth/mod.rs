/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 identity tokens
/// - [`middleware`]: Request auth context and bearer token parsing
/// - [`authorization`]: Role and ownership checks
///
/// # Example
///
/// ```
/// use taskreview_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskreview_shared::auth::password::{hash_password, verify_password};
/// use taskreview_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4(), Role::Employee), "secret-key")?;
/// let claims = validate_token(&token, "secret-key")?;
/// assert_eq!(claims.role, Role::Employee);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
