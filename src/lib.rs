pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::ServiceConfig;
use crate::services::converter::DocumentConverter;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::convert::convert_document,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::convert::ConvertResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "convert", description = "Document conversion endpoints"),
        (name = "system", description = "Service health endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<dyn DocumentConverter>,
    pub config: ServiceConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/convert",
            post(api::handlers::convert::convert_document),
        )
        .route("/health", get(api::handlers::health::health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
        ))
        .with_state(state)
}
