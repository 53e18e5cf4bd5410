use crate::config::db::DB;
use crate::config::AppConfig;
use crate::errors::{any_error, ApiError, PageError};
use crate::route::{blog_api, blog_page};
use crate::service::render_service::MarkdownRenderer;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

pub mod config;
pub mod errors;
pub mod model;
pub mod route;
pub mod service;
pub mod util;

// Application state shared across handlers
// Cloning AppState is cheap because every resource sits behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DB>,
    pub renderer: Arc<MarkdownRenderer>,
}

// Application router creation
pub async fn create_app(state: AppState) -> Result<Router> {
    let config = &state.config;

    let static_route = Router::new().nest_service(
        &config.static_url,
        ServeDir::new(&config.static_path).not_found_service(handle_404.into_service()),
    );

    let api_route = blog_api::create_routes()
        .method_not_allowed_fallback(handle_api_405)
        .fallback(handle_api_404);

    // The order of the layers is important.
    // https://docs.rs/axum/latest/axum/middleware/index.html#ordering
    let mut app = Router::new()
        .nest("/api", api_route)
        .merge(blog_page::create_routes(config)?)
        .merge(static_route)
        .method_not_allowed_fallback(handle_405)
        .fallback(handle_404)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.http.request_timeout_secs,
                )))
                .layer(DefaultBodyLimit::max(config.http.max_body_size as usize))
                .layer(config.http.cors.clone().into_layer()?),
        );

    if config.log.log_requests {
        app = app.layer(TraceLayer::new_for_http());
    }
    Ok(app.with_state(state))
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::from_env()?;

        let db = DB::new(&config.db.url, config.db.pool_size)
            .await
            .context("Cannot connect to database")?;

        Ok(AppState::with_db(config, db))
    }

    /// Builds the state around an existing database, the renderer is set
    /// up from the configured highlight theme.
    pub fn with_db(config: AppConfig, db: DB) -> Self {
        let renderer = MarkdownRenderer::with_theme(&config.site.highlight_theme);

        AppState {
            config: Arc::new(config),
            db: Arc::new(db),
            renderer: Arc::new(renderer),
        }
    }
}

async fn handle_404(uri: Uri) -> PageError {
    debug!("no page at {}", uri);
    PageError::NotFound
}

async fn handle_405() -> PageError {
    PageError::MethodNotAllowed
}

async fn handle_api_404() -> ApiError {
    any_error(404, "Not Found", None)
}

async fn handle_api_405() -> ApiError {
    any_error(405, "Method Not Allowed", None)
}

// Custom panic handler, logs the panic and returns a 500 response
fn handle_panic(panic: Box<dyn std::any::Any + Send>) -> Response {
    let panic_message = if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Unknown panic"
    };

    error!("App panicked: {}", panic_message);
    any_error(500, "Internal Server Error", None).into_response()
}
