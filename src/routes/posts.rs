use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;

use crate::backend::FileUpload;
use crate::error::{AppError, AppResult};
use crate::models::{Listing, NewPost, Post, UpdatePost};
use crate::state::AppState;

// --- Requests ---

#[derive(Deserialize)]
pub struct FeedParams {
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(rename = "imageId", default)]
    pub image_id: String,
}

#[derive(Deserialize)]
pub struct LikesRequest {
    pub likes: Vec<String>,
}

/// Text fields and the optional file of a post form.
struct PostForm {
    fields: HashMap<String, String>,
    file: Option<FileUpload>,
}

impl PostForm {
    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("missing form field {}", name)))
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.text(name).filter(|v| !v.trim().is_empty())
    }
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data: Bytes = field.bytes().await?;
            // Browsers send an empty part when no file was picked
            if !data.is_empty() {
                file = Some(FileUpload {
                    name: file_name,
                    content_type,
                    data,
                });
            }
        } else {
            fields.insert(name, field.text().await?);
        }
    }

    Ok(PostForm { fields, file })
}

// --- Router ---

/// Post routes; multipart bodies may be up to `max_upload_bytes`.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/posts", get(infinite_posts).post(create_post))
        .route("/posts/recent", get(recent_posts))
        .route("/posts/search", get(search_posts))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/{id}/likes", put(like_post))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// --- Handlers ---

async fn infinite_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<Json<Listing<Post>>> {
    let page = state
        .gateway
        .get_infinite_posts(params.cursor.as_deref())
        .await?;
    Ok(Json(page))
}

async fn recent_posts(State(state): State<AppState>) -> AppResult<Json<Listing<Post>>> {
    Ok(Json(state.gateway.get_recent_posts().await?))
}

async fn search_posts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Listing<Post>>> {
    Ok(Json(state.gateway.search_posts(&params.q).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.gateway.get_post_by_id(&id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Post>)> {
    let form = read_post_form(multipart).await?;
    let file = form
        .file
        .clone()
        .ok_or_else(|| AppError::BadRequest("a post needs an image file".into()))?;

    let post = NewPost {
        user_id: form.required("userId")?,
        caption: form.text("caption").unwrap_or_default(),
        file,
        location: form.optional("location"),
        tags: form.text("tags"),
    };

    let created = state.gateway.create_post(post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<Post>> {
    let form = read_post_form(multipart).await?;

    let post = UpdatePost {
        post_id: id,
        caption: form.text("caption").unwrap_or_default(),
        image_url: form.required("imageUrl")?,
        image_id: form.required("imageId")?,
        file: form.file.clone(),
        location: form.optional("location"),
        tags: form.text("tags"),
    };

    Ok(Json(state.gateway.update_post(post).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> AppResult<StatusCode> {
    state.gateway.delete_post(&id, &params.image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LikesRequest>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.gateway.like_post(&id, &req.likes).await?))
}
