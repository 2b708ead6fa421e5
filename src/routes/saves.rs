use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::SaveRecord;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub post_id: String,
    pub user_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/saves", post(save_post))
        .route("/saves/{id}", delete(delete_saved_post))
}

async fn save_post(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> AppResult<(StatusCode, Json<SaveRecord>)> {
    let record = state.gateway.save_post(&req.post_id, &req.user_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_saved_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.gateway.delete_saved_post(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
