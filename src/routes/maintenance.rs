use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::gateway::Compensation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/maintenance/orphans", get(list_orphans))
        .route("/maintenance/orphans/retry", post(retry_orphans))
}

async fn list_orphans(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.gateway.orphaned_files().await)
}

async fn retry_orphans(State(state): State<AppState>) -> Json<Vec<Compensation>> {
    Json(state.gateway.retry_orphaned_files().await)
}
