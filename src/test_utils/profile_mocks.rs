use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::storage::avatar_path,
    application::{
        app_error::{AppError, AppResult},
        use_cases::profile::{AvatarStorage, ProfileRepo},
    },
    domain::entities::{session::Session, user_profile::UserProfile},
};

#[derive(Default)]
pub struct InMemoryProfileRepo {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
    fetches: AtomicUsize,
}

impl InMemoryProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    /// Number of `get_by_id` calls so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Changes the stored name behind the application's back.
    pub fn rename(&self, id: Uuid, name: &str) {
        if let Some(profile) = self.profiles.lock().unwrap().get_mut(&id) {
            profile.name = name.to_string();
        }
    }
}

#[async_trait]
impl ProfileRepo for InMemoryProfileRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(id))
    }

    async fn ensure_profile(&self, id: Uuid, email: &str, name: &str) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(id).or_insert_with(|| UserProfile {
            id,
            name: name.to_string(),
            introduce: String::new(),
            avatar_url: None,
            email: email.to_string(),
        });
        profile.email = email.to_string();
        Ok(profile.clone())
    }

    async fn update_details(&self, id: Uuid, name: &str, introduce: &str) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&id).ok_or(AppError::NotFound)?;
        profile.name = name.to_string();
        profile.introduce = introduce.to_string();
        Ok(profile.clone())
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&id).ok_or(AppError::NotFound)?;
        profile.avatar_url = Some(avatar_url.to_string());
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAvatarStorage {
    uploads: AtomicUsize,
}

impl InMemoryAvatarStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvatarStorage for InMemoryAvatarStorage {
    async fn upload(
        &self,
        session: &Session,
        content_type: &str,
        _bytes: Vec<u8>,
    ) -> AppResult<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "http://storage.test/avatars/{}",
            avatar_path(session.user_id, content_type)
        ))
    }
}
