use std::net::SocketAddr;

use axum::{
    extract::rejection::JsonRejection,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::{diary, error::DiaryError, labels, session, steam, weather, AppState};
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

impl IntoResponse for DiaryError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            DiaryError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
            DiaryError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            DiaryError::Conflict(_) => (StatusCode::CONFLICT, "Already exists"),
            DiaryError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream service error"),
            DiaryError::Persist(_) | DiaryError::Io(_) | DiaryError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        if status.is_server_error() {
            log_error!("Request failed: {}", self);
        }

        let body = serde_json::json!({
            "error": error,
            "details": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Malformed or mistyped JSON bodies are the caller's fault, like bad dates.
impl From<JsonRejection> for DiaryError {
    fn from(rejection: JsonRejection) -> Self {
        DiaryError::InvalidInput(rejection.body_text())
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/diaries", get(diary::commands::list_diaries))
        .route(
            "/api/diaries/{date}",
            get(diary::commands::get_diary)
                .post(diary::commands::create_diary)
                .put(diary::commands::save_diary)
                .delete(diary::commands::delete_diary),
        )
        .route(
            "/api/labels",
            get(labels::commands::get_labels).post(labels::commands::create_label),
        )
        .route(
            "/api/labels/{id}",
            put(labels::commands::update_label).delete(labels::commands::delete_label),
        )
        .route("/api/session", get(session::commands::get_session))
        .route("/api/session/select", post(session::commands::select_entry))
        .route("/api/session/create", post(session::commands::create_entry))
        .route("/api/session/content", put(session::commands::update_content))
        .route("/api/session/save", post(session::commands::save_now))
        .route(
            "/api/session/labels",
            get(session::commands::get_labels).put(session::commands::set_labels),
        )
        .route("/api/steam", get(steam::commands::list_exports))
        .route("/api/steam/generate", post(steam::commands::generate_export))
        .route("/api/steam/{date}", get(steam::commands::get_export))
        .route("/api/weather", get(weather::commands::get_weather))
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, letting in-flight requests finish.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log_info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log_info!("HTTP API stopped");
    Ok(())
}
