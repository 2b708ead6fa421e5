pub mod accounts;
pub mod maintenance;
pub mod posts;
pub mod saves;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Every gateway route, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let api = Router::new()
        .merge(accounts::router())
        .merge(posts::router(max_upload_bytes))
        .merge(saves::router())
        .merge(users::router())
        .merge(maintenance::router());

    Router::new().nest("/api", api).with_state(state)
}
