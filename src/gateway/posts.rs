use serde_json::json;

use super::{decode_list, normalize_tags, require, Gateway, GatewayResult};
use crate::backend::{FileUpload, PreviewOptions, Query};
use crate::models::{Listing, NewPost, Post, UpdatePost};

/// An upload that has a preview URL.
struct UploadedImage {
    file_id: String,
    url: String,
}

impl Gateway {
    /// Upload a file and derive its preview, deleting it if the preview fails.
    async fn upload_image(&self, file: FileUpload) -> GatewayResult<UploadedImage> {
        let stored = self.backend.create_file(file).await?;

        match self
            .backend
            .file_preview(&stored.id, PreviewOptions::POST_IMAGE)
            .await
        {
            Ok(url) => Ok(UploadedImage {
                file_id: stored.id,
                url: url.to_string(),
            }),
            Err(e) => Err(self.compensate(&stored.id, e.into()).await),
        }
    }

    pub async fn create_post(&self, post: NewPost) -> GatewayResult<Post> {
        require(&post.user_id, "user id")?;

        let image = self.upload_image(post.file).await?;
        let tags = normalize_tags(post.tags.as_deref());

        let data = json!({
            "creator": post.user_id,
            "caption": post.caption,
            "imageUrl": image.url,
            "imageId": image.file_id,
            "location": post.location,
            "tags": tags,
        });

        let created = match self
            .backend
            .create_document(&self.collections.posts, data)
            .await
        {
            Ok(doc) => doc,
            Err(e) => return Err(self.compensate(&image.file_id, e.into()).await),
        };

        tracing::info!(post_id = %created.id, file_id = %image.file_id, "Post created");
        Ok(created.into_model()?)
    }

    /// Update caption, location and tags, and the image when a new file is
    /// attached. The replaced file is left in storage.
    pub async fn update_post(&self, post: UpdatePost) -> GatewayResult<Post> {
        require(&post.post_id, "post id")?;

        let (image_url, image_id, uploaded) = match post.file {
            Some(file) => {
                let image = self.upload_image(file).await?;
                (image.url, image.file_id.clone(), Some(image.file_id))
            }
            None => (post.image_url, post.image_id, None),
        };
        let tags = normalize_tags(post.tags.as_deref());

        let data = json!({
            "caption": post.caption,
            "imageUrl": image_url,
            "imageId": image_id,
            "location": post.location,
            "tags": tags,
        });

        match self
            .backend
            .update_document(&self.collections.posts, &post.post_id, data)
            .await
        {
            Ok(doc) => {
                tracing::info!(post_id = %post.post_id, "Post updated");
                Ok(doc.into_model()?)
            }
            Err(e) => match uploaded {
                Some(file_id) => Err(self.compensate(&file_id, e.into()).await),
                None => Err(e.into()),
            },
        }
    }

    /// Delete the post document. Its image file stays in storage.
    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> GatewayResult<()> {
        require(post_id, "post id")?;
        require(image_id, "image id")?;

        self.backend
            .delete_document(&self.collections.posts, post_id)
            .await?;
        tracing::info!(post_id, "Post deleted");
        Ok(())
    }

    /// Replace the likes list wholesale; concurrent callers race and the
    /// last write wins.
    pub async fn like_post(&self, post_id: &str, likes: &[String]) -> GatewayResult<Post> {
        require(post_id, "post id")?;

        let doc = self
            .backend
            .update_document(&self.collections.posts, post_id, json!({ "likes": likes }))
            .await?;
        Ok(doc.into_model()?)
    }

    pub async fn get_post_by_id(&self, post_id: &str) -> GatewayResult<Post> {
        require(post_id, "post id")?;

        let doc = self
            .backend
            .get_document(&self.collections.posts, post_id)
            .await?;
        Ok(doc.into_model()?)
    }

    pub async fn get_recent_posts(&self) -> GatewayResult<Listing<Post>> {
        let list = self
            .backend
            .list_documents(
                &self.collections.posts,
                &[
                    Query::order_desc("$createdAt"),
                    Query::limit(self.feed.recent_limit),
                ],
            )
            .await?;
        decode_list(list)
    }

    /// One page of the feed, newest update first, resuming after `cursor`.
    pub async fn get_infinite_posts(&self, cursor: Option<&str>) -> GatewayResult<Listing<Post>> {
        let mut queries = vec![
            Query::order_desc("$updatedAt"),
            Query::limit(self.feed.page_size),
        ];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            queries.push(Query::cursor_after(cursor));
        }

        let list = self
            .backend
            .list_documents(&self.collections.posts, &queries)
            .await?;
        decode_list(list)
    }

    pub async fn search_posts(&self, term: &str) -> GatewayResult<Listing<Post>> {
        let list = self
            .backend
            .list_documents(&self.collections.posts, &[Query::search("caption", term)])
            .await?;
        decode_list(list)
    }
}
