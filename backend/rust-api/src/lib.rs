#![allow(dead_code)]

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self'; \
             style-src 'self'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS configuration for the mobile/web presentation clients
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .merge(tasks_routes().layer(cors.clone()))
        .merge(surveys_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn tasks_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/api/v1/tasks/", get(handlers::tasks::list_tasks))
        .route("/api/v1/tasks/{id}", get(handlers::tasks::get_task))
}

fn surveys_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/api/v1/surveys/", post(handlers::surveys::create_survey))
        .route(
            "/api/v1/surveys/{id}",
            get(handlers::surveys::get_survey).delete(handlers::surveys::abandon_survey),
        )
        .route(
            "/api/v1/surveys/{id}/answers",
            post(handlers::surveys::submit_selection),
        )
        .route(
            "/api/v1/surveys/{id}/advance",
            post(handlers::surveys::advance_survey),
        )
        .route(
            "/api/v1/surveys/{id}/results",
            get(handlers::surveys::get_results),
        )
        .route(
            "/api/v1/surveys/{id}/stream",
            get(handlers::sse::survey_stream),
        )
}
