use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::profile::AvatarStorage,
    domain::entities::session::Session,
    infra::http_client,
};

/// File extension for an accepted avatar content type.
pub fn avatar_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        _ => "jpg",
    }
}

/// Object path for a new avatar. Every upload gets a fresh name so cached copies of
/// the previous image never shadow the new one.
pub fn avatar_path(user_id: Uuid, content_type: &str) -> String {
    format!(
        "{}/{}.{}",
        user_id,
        Uuid::new_v4(),
        avatar_extension(content_type)
    )
}

/// Avatar uploads to the hosted object storage, authorised as the signed-in user.
pub struct ObjectStorageAvatarStorage {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
    bucket: String,
}

impl ObjectStorageAvatarStorage {
    pub fn new(base_url: Url, anon_key: SecretString, bucket: String) -> Self {
        Self {
            client: http_client::build_client(),
            base_url,
            anon_key,
            bucket,
        }
    }

    fn root(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.root(),
            self.bucket,
            path
        )
    }
}

#[async_trait]
impl AvatarStorage for ObjectStorageAvatarStorage {
    async fn upload(&self, session: &Session, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        let path = avatar_path(session.user_id, content_type);
        let url = format!("{}/storage/v1/object/{}/{}", self.root(), self.bucket, path);

        self.client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(session.access_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload avatar: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Storage(format!("Storage API error: {e}")))?;

        Ok(self.public_url(&path))
    }
}
