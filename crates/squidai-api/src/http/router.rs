//! Axum router configuration with middleware.
//!
//! API routes live under `/api/`. Middleware: CORS, request tracing.
//!
//! A built web client can be served from disk (`SQUIDAI_WEB_DIR`, default
//! `web/dist`). API routes and `/health` take priority; unknown paths fall
//! through to the client's `index.html`. If the directory does not exist,
//! only the API is served.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::relay_chat))
        .route("/generate-image", post(handlers::image::generate_image))
        .route(
            "/sessions",
            get(handlers::session::list_sessions)
                .post(handlers::session::mutate_sessions)
                .delete(handlers::session::delete_sessions),
        )
        .route("/save-search", post(handlers::telemetry::save_search))
        .route("/save-chat-message", post(handlers::telemetry::save_chat_message))
        .route("/users/upsert", post(handlers::telemetry::upsert_user))
        .route("/mongodb-status", get(handlers::status::mongodb_status));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let web_dir = std::env::var("SQUIDAI_WEB_DIR").unwrap_or_else(|_| "web/dist".to_string());
    if std::path::Path::new(&web_dir).exists() {
        let index_path = format!("{web_dir}/index.html");
        let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %web_dir, "Static web client serving enabled");
    }

    router
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
