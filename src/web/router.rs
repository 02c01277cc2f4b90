//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{LookupResponse, ShareInfoResponse};
use super::error::{ErrorBody, ErrorCode, ErrorDetail};
use super::handlers::{self, AppState};
use super::middleware::{api_rate_limit, create_cors_layer, security_headers, RateLimitState};
use crate::config::WebConfig;

/// Extra slack on the body limit so multipart framing never clips a
/// maximum-size file.
const BODY_LIMIT_SLACK: u64 = 1024 * 1024;

/// OpenAPI documentation for the share API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Droplink API",
        description = "File sharing service: upload a file, get a short code and a time-limited download link."
    ),
    paths(
        handlers::share::upload_file,
        handlers::share::lookup_share,
        handlers::share::download_share,
    ),
    components(schemas(
        ShareInfoResponse,
        LookupResponse,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    tags(
        (name = "share", description = "Upload, lookup, and download operations")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, web_config: &WebConfig) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(handlers::upload_file))
        .route("/lookup/:code", get(handlers::lookup_share))
        .route("/download/:code", get(handlers::download_share));

    let rate_limit_state = Arc::new(RateLimitState::new(web_config.api_rate_limit));
    rate_limit_state.clone().start_cleanup_task();

    let body_limit = app_state.max_upload_size + BODY_LIMIT_SLACK;

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit as usize))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&web_config.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = rate_limit_state.clone();
                    api_rate_limit(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Create a static file router for the bundled frontend.
///
/// Unknown paths (including `/d/:code` download pages) fall back to
/// `index.html` so client-side routing works.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let path = Path::new(static_path);
    if !path.is_dir() {
        tracing::warn!(
            path = %static_path,
            "Static directory not found; static serving disabled"
        );
        return None;
    }

    let index = path.join("index.html");
    let service = ServeDir::new(path).fallback(ServeFile::new(index));

    Some(Router::new().fallback_service(service))
}
