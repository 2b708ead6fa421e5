use super::{require, Gateway, GatewayError, GatewayResult};
use crate::backend::{Query, Session};
use crate::models::{NewProfile, NewUser, Post, Ref, UserProfile};

impl Gateway {
    /// Create the account, then the profile document that points at it.
    pub async fn create_account(&self, user: NewUser) -> GatewayResult<UserProfile> {
        require(&user.email, "email")?;
        require(&user.password, "password")?;
        require(&user.name, "name")?;

        let account = self
            .backend
            .create_account(&user.email, &user.password, &user.name)
            .await?;
        tracing::info!(account_id = %account.id, "Account created");

        let avatar = self.backend.avatar_initials_url(&account.name);
        let profile = NewProfile {
            account_id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            username: user.username,
            image_url: avatar.to_string(),
        };

        // Accounts cannot be removed from the client side, so a failure here
        // leaves an account without a profile.
        self.create_user_profile(profile).await.map_err(|e| {
            tracing::error!(account_id = %account.id, error = %e, "Profile creation failed");
            e
        })
    }

    pub async fn create_user_profile(&self, profile: NewProfile) -> GatewayResult<UserProfile> {
        let data = serde_json::to_value(&profile)?;
        let doc = self
            .backend
            .create_document(&self.collections.users, data)
            .await?;
        Ok(doc.into_model()?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        require(email, "email")?;
        require(password, "password")?;

        let session = self.backend.create_email_session(email, password).await?;
        tracing::info!(user_id = %session.user_id, "Session created");
        Ok(session)
    }

    /// Profile of the account behind the active session.
    pub async fn get_current_user(&self) -> GatewayResult<UserProfile> {
        let account = self.backend.get_account().await?;

        let list = self
            .backend
            .list_documents(
                &self.collections.users,
                &[Query::equal("accountId", account.id.clone()), Query::limit(1)],
            )
            .await?;

        match list.documents.into_iter().next() {
            Some(doc) => Ok(doc.into_model()?),
            None => Err(GatewayError::NotFound(format!(
                "profile for account {}",
                account.id
            ))),
        }
    }

    pub async fn sign_out(&self) -> GatewayResult<()> {
        self.backend.delete_current_session().await?;
        tracing::info!("Session deleted");
        Ok(())
    }

    /// Posts the current user has liked, in the order the profile lists them.
    pub async fn get_liked_posts(&self) -> GatewayResult<Vec<Post>> {
        let profile = self.get_current_user().await?;

        let mut posts = Vec::with_capacity(profile.liked.len());
        for liked in profile.liked {
            match liked {
                Ref::Expanded(post) => posts.push(*post),
                Ref::Id(id) => posts.push(self.get_post_by_id(&id).await?),
            }
        }
        Ok(posts)
    }
}
