//! Common test utilities for API tests
//!
//! Every test gets its own router over a fresh in-memory store, so tests
//! run in parallel without a database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use taskreview_api::app::{build_router, AppState};
use taskreview_api::config::Config;
use taskreview_shared::store::memory::MemoryStore;
use tower::ServiceExt;

/// A registered account and its bearer token
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub token: String,
}

/// Router plus the in-memory store behind it
pub struct TestApp {
    pub router: axum::Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Config::for_tests());
        Self {
            router: build_router(state),
            store,
        }
    }

    /// Sends a request and returns the status with the parsed body
    ///
    /// Empty bodies parse as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request_raw(method, uri, token, body.map(|b| b.to_string())).await
    }

    /// Like [`TestApp::request`], with the JSON body sent verbatim
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn post_raw(&self, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
        self.request_raw(Method::POST, uri, Some(token), Some(body.to_string())).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers an account and returns its id and token
    pub async fn register(&self, username: &str, role: &str) -> Account {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "password123",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        Account {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn manager(&self, username: &str) -> Account {
        self.register(username, "manager").await
    }

    pub async fn employee(&self, username: &str) -> Account {
        self.register(username, "employee").await
    }

    /// Creates a task as `manager` for `employee`, returning its id
    pub async fn create_task(&self, manager: &Account, employee: &Account, title: &str) -> String {
        let (status, body) = self
            .post(
                "/tasks",
                &manager.token,
                json!({
                    "title": title,
                    "description": "Write the quarterly report",
                    "assigned_to": employee.id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Creates a review as `manager` for `employee` on `task_id`, returning its id
    pub async fn create_review(
        &self,
        manager: &Account,
        employee: &Account,
        task_id: &str,
        module_id: i32,
    ) -> String {
        let (status, body) = self
            .post(
                "/reviews",
                &manager.token,
                json!({
                    "task_id": task_id,
                    "employee_id": employee.id,
                    "module_id": module_id,
                    "title": format!("Module {} review", module_id),
                    "description": "Assess the module",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create review failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

/// Score recorded for `module_id` in a user JSON object
pub fn module_score(user: &Value, module_id: i64) -> i64 {
    user["modules_scores"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["module_id"] == module_id)
        .and_then(|entry| entry["score"].as_i64())
        .unwrap()
}
