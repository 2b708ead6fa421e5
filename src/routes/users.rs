use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{Listing, SaveRecord, UserProfile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UsersParams {
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/saves", get(saved_posts))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UsersParams>,
) -> AppResult<Json<Listing<UserProfile>>> {
    Ok(Json(state.gateway.get_users(params.limit).await?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.gateway.get_user_by_id(&id).await?))
}

async fn saved_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing<SaveRecord>>> {
    Ok(Json(state.gateway.get_saved_posts(&id).await?))
}
