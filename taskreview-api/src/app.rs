/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskreview_api::{app::{build_router, AppState}, config::Config};
/// use taskreview_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskreview_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /auth
/// │   ├── POST /register
/// │   ├── POST /login
/// │   └── GET  /me                           (auth)
/// ├── /tasks                                  (auth)
/// │   ├── GET, POST /
/// │   ├── GET, PUT, DELETE /:id
/// │   └── POST /:id/submit
/// ├── /reviews                                (auth)
/// │   ├── GET, POST /
/// │   ├── GET, PUT, DELETE /:id
/// │   ├── POST /:id/submit
/// │   ├── GET  /suggestions/:employee_id
/// │   └── GET  /employee/:employee_id
/// └── /users                                  (auth)
///     ├── GET /
///     ├── GET /employees
///     └── GET, PUT, DELETE /:id
/// ```
///
/// Role and ownership checks happen inside the handlers.
pub fn build_router(state: AppState) -> Router {
    let auth_layer = axum::middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::auth::require_auth,
    );

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let private_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(auth_layer.clone());

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/submit", post(routes::tasks::submit_task))
        .route_layer(auth_layer.clone());

    let review_routes = Router::new()
        .route("/", get(routes::reviews::list_reviews).post(routes::reviews::create_review))
        .route(
            "/:id",
            get(routes::reviews::get_review)
                .put(routes::reviews::update_review)
                .delete(routes::reviews::delete_review),
        )
        .route("/:id/submit", post(routes::reviews::submit_review))
        .route("/suggestions/:employee_id", get(routes::reviews::suggestions))
        .route("/employee/:employee_id", get(routes::reviews::employee_reviews))
        .route_layer(auth_layer.clone());

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/employees", get(routes::users::list_employees))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route_layer(auth_layer);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", public_auth_routes.merge(private_auth_routes))
        .nest("/tasks", task_routes)
        .nest("/reviews", review_routes)
        .nest("/users", user_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
