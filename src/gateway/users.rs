use super::{decode_list, require, Gateway, GatewayResult};
use crate::backend::Query;
use crate::models::{Listing, UserProfile};

impl Gateway {
    /// Profiles, newest first, optionally capped.
    pub async fn get_users(&self, limit: Option<u32>) -> GatewayResult<Listing<UserProfile>> {
        let mut queries = vec![Query::order_desc("$createdAt")];
        if let Some(limit) = limit.filter(|l| *l > 0) {
            queries.push(Query::limit(limit));
        }

        let list = self
            .backend
            .list_documents(&self.collections.users, &queries)
            .await?;
        decode_list(list)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> GatewayResult<UserProfile> {
        require(user_id, "user id")?;

        let doc = self
            .backend
            .get_document(&self.collections.users, user_id)
            .await?;
        Ok(doc.into_model()?)
    }
}
