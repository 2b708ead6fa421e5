use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::backend::Session;
use crate::error::AppResult;
use crate::models::{NewUser, Post, UserProfile};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/sessions", post(sign_in))
        .route("/sessions/current", delete(sign_out))
        .route("/me", get(current_user))
        .route("/me/liked", get(liked_posts))
}

async fn create_account(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.gateway.create_account(user).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> AppResult<(StatusCode, Json<Session>)> {
    let session = state.gateway.sign_in(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn sign_out(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.gateway.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_user(State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.gateway.get_current_user().await?))
}

async fn liked_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.gateway.get_liked_posts().await?))
}
