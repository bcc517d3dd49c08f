use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    application::{
        app_error::{AppError, AppResult},
        validators::validate_avatar,
    },
    domain::entities::{session::Session, user_profile::UserProfile},
};

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;
    /// Creates the profile if it does not exist yet and keeps its email in step with
    /// the provider. The name is only used on insert.
    async fn ensure_profile(&self, id: Uuid, email: &str, name: &str) -> AppResult<UserProfile>;
    async fn update_details(&self, id: Uuid, name: &str, introduce: &str) -> AppResult<UserProfile>;
    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> AppResult<UserProfile>;
}

#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Stores the image under the session user's folder and returns its public URL.
    async fn upload(&self, session: &Session, content_type: &str, bytes: Vec<u8>) -> AppResult<String>;
}

#[derive(Clone)]
pub struct ProfileUseCases {
    repo: Arc<dyn ProfileRepo>,
    storage: Arc<dyn AvatarStorage>,
    avatar_max_bytes: usize,
}

impl ProfileUseCases {
    pub fn new(
        repo: Arc<dyn ProfileRepo>,
        storage: Arc<dyn AvatarStorage>,
        avatar_max_bytes: usize,
    ) -> Self {
        Self {
            repo,
            storage,
            avatar_max_bytes,
        }
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn get(&self, session: &Session) -> AppResult<UserProfile> {
        self.repo
            .get_by_id(session.user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Profile row for a verified session, created on first sight.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn ensure_for_session(&self, session: &Session) -> AppResult<UserProfile> {
        let name = session.name.as_deref().unwrap_or_default();
        self.repo
            .ensure_profile(session.user_id, &session.email, name)
            .await
    }

    /// Reads the profile, falling back to creating it for sessions that predate it.
    pub async fn load_for_session(&self, session: &Session) -> AppResult<UserProfile> {
        match self.repo.get_by_id(session.user_id).await? {
            Some(profile) => Ok(profile),
            None => self.ensure_for_session(session).await,
        }
    }

    #[instrument(skip(self, session, introduce), fields(user_id = %session.user_id))]
    pub async fn update_details(
        &self,
        session: &Session,
        name: &str,
        introduce: &str,
    ) -> AppResult<UserProfile> {
        let profile = self
            .repo
            .update_details(session.user_id, name, introduce)
            .await?;
        tracing::info!("Profile updated");
        Ok(profile)
    }

    #[instrument(skip(self, session, bytes), fields(user_id = %session.user_id, size = bytes.len()))]
    pub async fn upload_avatar(
        &self,
        session: &Session,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> AppResult<UserProfile> {
        validate_avatar(content_type, bytes.len(), self.avatar_max_bytes)?;
        let content_type = content_type.unwrap_or_default();

        let url = self
            .storage
            .upload(session, content_type, bytes)
            .await?;
        let profile = self.repo.set_avatar_url(session.user_id, &url).await?;
        tracing::info!(avatar_url = %url, "Avatar replaced");
        Ok(profile)
    }
}
