//! REST API over the planner.

mod error;
mod notifications;
mod scans;
mod tasks;
mod users;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::ServerConfig;
use crate::planner::{Planner, PlannerError};

pub type AppState = Arc<Planner>;

/// Build the API router. Unknown paths are served from `static_dir` when
/// one is given, with `index.html` as the fallback for client-side routes.
pub fn router(planner: AppState, static_dir: Option<&std::path::Path>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(tasks::list).post(tasks::add))
        .route("/api/tasks/analyze", post(tasks::analyze))
        .route("/api/tasks/{id}", put(tasks::update).delete(tasks::remove))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/{id}", get(users::get))
        .route(
            "/api/notifications",
            get(notifications::list)
                .post(notifications::create)
                .delete(notifications::clear),
        )
        .route("/api/notifications/sweep", post(notifications::sweep))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/{id}", delete(notifications::remove))
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .route("/api/scans/gmail", post(scans::gmail))
        .route("/api/scans/imap", post(scans::imap))
        .route("/api/scans/{user_id}", get(scans::history).post(scans::record))
        .with_state(planner);

    let app = match static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            api.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => api,
    };

    app.layer(axum::middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
}

/// Run a planner call on the blocking pool. Store calls read and write files
/// while holding a lock.
async fn blocking<T, F>(planner: &AppState, f: F) -> Result<T, PlannerError>
where
    T: Send + 'static,
    F: FnOnce(&Planner) -> Result<T, PlannerError> + Send + 'static,
{
    let planner = Arc::clone(planner);
    tokio::task::spawn_blocking(move || f(&planner)).await?
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed().as_millis();
    if status.is_server_error() {
        log::warn!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed);
    } else {
        log::info!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed);
    }
    response
}

/// Bind and serve until ctrl-c.
pub async fn serve(planner: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let app = router(planner, config.static_dir.as_deref());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Shutting down");
        })
        .await
}
