//! Saves API
//!
//! Endpoints:
//! - POST   /saves/create              - Allocate a 9-char code
//! - GET    /saves/:code               - List presets (metadata only)
//! - POST   /saves/:code               - Upsert a preset snapshot
//! - GET    /saves/:code/preset/:name  - Return one snapshot
//! - DELETE /saves/:code/preset/:name  - Remove a preset
//!
//! Snapshot documents use a closed schema; unknown fields are rejected.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::ApiResponse;
use crate::services::SaveError;
use crate::types::{SaveRecordSummary, SessionSnapshot};
use crate::AppState;

/// Create saves router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/saves/create", post(create_code))
        .route("/saves/:code", get(get_record))
        .route("/saves/:code", post(put_preset))
        .route("/saves/:code/preset/:name", get(get_preset))
        .route("/saves/:code/preset/:name", delete(delete_preset))
}

impl IntoResponse for SaveError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            SaveError::CodeNotFound(_) | SaveError::PresetNotFound(_) => StatusCode::NOT_FOUND,
            SaveError::InvalidPresetName => StatusCode::BAD_REQUEST,
            SaveError::CollisionExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}

/// POST /saves/create
async fn create_code(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), SaveError> {
    let code = state.saves.create_code()?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: serde_json::json!({ "code": code }),
        }),
    ))
}

/// GET /saves/:code
async fn get_record(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<SaveRecordSummary>>, SaveError> {
    let summary = state.saves.get(&code)?;
    Ok(Json(ApiResponse { data: summary }))
}

#[derive(Debug, Deserialize)]
struct PutPresetRequest {
    name: String,
    snapshot: serde_json::Value,
}

/// POST /saves/:code
///
/// The snapshot body is re-parsed against the closed schema so drifted
/// documents are rejected with a validation error rather than stored.
async fn put_preset(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<PutPresetRequest>,
) -> Result<Json<ApiResponse<SaveRecordSummary>>, axum::response::Response> {
    let snapshot: SessionSnapshot = serde_json::from_value(request.snapshot).map_err(|e| {
        crate::error::AppError::BadRequest(format!("Invalid snapshot: {}", e)).into_response()
    })?;

    state
        .saves
        .put(&code, &request.name, snapshot)
        .map_err(IntoResponse::into_response)?;
    let summary = state
        .saves
        .get(&code)
        .map_err(IntoResponse::into_response)?;
    Ok(Json(ApiResponse { data: summary }))
}

/// GET /saves/:code/preset/:name
async fn get_preset(
    State(state): State<AppState>,
    Path((code, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<SessionSnapshot>>, SaveError> {
    let snapshot = state.saves.get_preset(&code, &name)?;
    Ok(Json(ApiResponse { data: snapshot }))
}

/// DELETE /saves/:code/preset/:name
async fn delete_preset(
    State(state): State<AppState>,
    Path((code, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, SaveError> {
    state.saves.delete_preset(&code, &name)?;
    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": name }),
    }))
}
