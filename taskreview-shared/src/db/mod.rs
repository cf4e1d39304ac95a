/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a health check
/// - `migrations`: Embedded schema migrations
///
/// Queries live next to their records in [`crate::models`].

pub mod migrations;
pub mod pool;
