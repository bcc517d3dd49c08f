//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` creates an `AppState` wired to in-memory ports and hands
//! the mocks back so tests can inspect them.

use std::sync::Arc;

use crate::{
    adapters::http::app_state::AppState,
    infra::setup::build_app_state,
    test_utils::{
        InMemoryAvatarStorage, InMemoryIdentityProvider, InMemoryProfileRepo, test_config,
    },
};

/// Handles to the in-memory ports behind a test `AppState`.
pub struct TestMocks {
    pub provider: Arc<InMemoryIdentityProvider>,
    pub profiles: Arc<InMemoryProfileRepo>,
    pub storage: Arc<InMemoryAvatarStorage>,
}

#[derive(Default)]
pub struct TestAppStateBuilder {
    provider: InMemoryIdentityProvider,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a confirmed account with the identity provider.
    pub fn with_user(mut self, email: &str, password: &str) -> Self {
        self.provider = self.provider.with_user(email, password);
        self
    }

    pub fn build(self) -> (AppState, TestMocks) {
        let mocks = TestMocks {
            provider: Arc::new(self.provider),
            profiles: Arc::new(InMemoryProfileRepo::new()),
            storage: Arc::new(InMemoryAvatarStorage::new()),
        };

        let app_state = build_app_state(
            test_config(),
            mocks.provider.clone(),
            mocks.profiles.clone(),
            mocks.storage.clone(),
        );

        (app_state, mocks)
    }
}
