//! Public board information API
//!
//! Board settings for the frontend and a health probe for load balancers.
//! No authentication required.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{BoardSettings, UpdateSettingsInput};

/// Response for the health probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Build the public settings router
pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings))
}

/// Build the admin settings router
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/settings", axum::routing::put(update_settings))
}

/// GET /discussBoard/settings - Public board settings
async fn get_settings(State(state): State<AppState>) -> Result<Json<BoardSettings>, ApiError> {
    Ok(Json(state.settings_service.get_board_settings().await?))
}

/// PUT /discussBoard/admin/settings - Update board settings
async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Json(body): Json<UpdateSettingsInput>,
) -> Result<Json<BoardSettings>, ApiError> {
    let settings = state.settings_service.update_board_settings(&body).await?;
    state
        .audit_service
        .record(
            Some(user.user().id),
            "settings_update",
            "settings",
            None,
            None,
            ip.as_string().as_deref(),
        )
        .await;
    Ok(Json(settings))
}

/// GET /health - Liveness and database reachability
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "ok",
                version,
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unreachable",
                    version,
                }),
            )
        }
    }
}
