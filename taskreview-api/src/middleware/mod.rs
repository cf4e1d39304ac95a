/// Middleware for the API server
///
/// - `security`: OWASP response headers
/// - `auth`: Bearer token authentication

pub mod auth;
pub mod security;
