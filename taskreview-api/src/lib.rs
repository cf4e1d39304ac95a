//! # TaskReview API Server Library
//!
//! HTTP layer for TaskReview: routing, authentication middleware, request
//! validation and the JSON envelope. Persistence and domain rules live in
//! `taskreview-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors that reject with the JSON envelope
//! - `middleware`: Authentication and security headers
//! - `response`: Success envelope
//! - `routes`: API route handlers
//! - `views`: Task and review responses with populated references

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod views;
