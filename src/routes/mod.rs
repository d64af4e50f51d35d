//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/stats", get(http::http_stats))
        // Students & profiles
        .route("/api/v1/students", post(http::http_register))
        .route("/api/v1/students/:id/login", post(http::http_login))
        .route(
            "/api/v1/students/:id/profile",
            get(http::http_get_profile).put(http::http_update_profile),
        )
        .route("/api/v1/students/:id/quiz", get(http::http_get_quiz))
        .route("/api/v1/students/:id/quiz/submit", post(http::http_submit_quiz))
        .route("/api/v1/students/:id/notifications", get(http::http_notifications))
        .route(
            "/api/v1/students/:id/notifications/read",
            post(http::http_mark_notifications_read),
        )
        .route("/api/v1/leaderboard", get(http::http_leaderboard))
        // Question management (teacher side; never touches profiles)
        .route(
            "/api/v1/questions",
            get(http::http_list_questions).post(http::http_create_question),
        )
        .route(
            "/api/v1/questions/:id",
            put(http::http_update_question).delete(http::http_delete_question),
        )
        // AI endpoints (fallback values when Gemini is disabled)
        .route("/api/v1/ai/questions", post(http::http_generate_questions))
        .route("/api/v1/ai/explain", post(http::http_explain))
        .route("/api/v1/students/:id/tutor/chat", post(http::http_tutor_chat))
        .route("/api/v1/students/:id/analysis", post(http::http_analyze))
        .route("/api/v1/students/:id/study-plan", post(http::http_study_plan))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
