use serde_json::json;

use super::{decode_list, require, Gateway, GatewayResult};
use crate::backend::Query;
use crate::models::{Listing, SaveRecord};

impl Gateway {
    pub async fn save_post(&self, post_id: &str, user_id: &str) -> GatewayResult<SaveRecord> {
        require(post_id, "post id")?;
        require(user_id, "user id")?;

        let doc = self
            .backend
            .create_document(
                &self.collections.saves,
                json!({ "user": user_id, "post": post_id }),
            )
            .await?;
        Ok(doc.into_model()?)
    }

    /// Remove a save record. Removing one that is already gone is `NotFound`.
    pub async fn delete_saved_post(&self, save_id: &str) -> GatewayResult<()> {
        require(save_id, "save id")?;

        self.backend
            .delete_document(&self.collections.saves, save_id)
            .await?;
        Ok(())
    }

    pub async fn get_saved_posts(&self, user_id: &str) -> GatewayResult<Listing<SaveRecord>> {
        require(user_id, "user id")?;

        let list = self
            .backend
            .list_documents(
                &self.collections.saves,
                &[Query::equal("user", user_id), Query::order_desc("$createdAt")],
            )
            .await?;
        decode_list(list)
    }
}
