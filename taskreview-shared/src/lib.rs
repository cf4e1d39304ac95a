//! # TaskReview Shared Library
//!
//! Domain types, scoring rules, auth primitives and persistence used by the
//! TaskReview API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and reviews with their SQL
//! - `scoring`: Module suggestion and score blending
//! - `auth`: Passwords, JWTs, auth context and authorization policy
//! - `db`: Connection pool and migrations
//! - `store`: The `Store` port with PostgreSQL and in-memory adapters

pub mod auth;
pub mod db;
pub mod models;
pub mod scoring;
pub mod store;

/// Current version of the TaskReview shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
