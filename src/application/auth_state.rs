//! Application-wide authentication state for one client context.
//!
//! [`UserState`] holds what the rest of the application reads: the auth state and the
//! signed-in user's profile. Only [`AuthStateListener`] writes to it, one event at a
//! time, in the order the gateway published them.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;

use crate::{
    application::use_cases::{auth::TokenStore, profile::ProfileUseCases},
    domain::entities::{auth_event::AuthEvent, session::Session, user_profile::UserProfile},
};

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    /// A session was accepted and its profile is being loaded.
    Transitioning,
    Authenticated(Session),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(s) => Some(s),
            AuthState::Anonymous | AuthState::Transitioning => None,
        }
    }
}

#[derive(Debug)]
pub struct UserState {
    auth: watch::Sender<AuthState>,
    profile: watch::Sender<Option<UserProfile>>,
}

impl Default for UserState {
    fn default() -> Self {
        let (auth, _) = watch::channel(AuthState::Anonymous);
        let (profile, _) = watch::channel(None);
        Self { auth, profile }
    }
}

impl UserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.borrow().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    pub fn watch_auth(&self) -> watch::Receiver<AuthState> {
        self.auth.subscribe()
    }

    pub fn watch_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile.subscribe()
    }

    fn begin_transition(&self) {
        self.auth.send_replace(AuthState::Transitioning);
    }

    fn authenticate(&self, session: Session, profile: Option<UserProfile>) {
        // Profile first so anyone woken by the auth change sees the matching profile.
        self.profile.send_replace(profile);
        self.auth.send_replace(AuthState::Authenticated(session));
    }

    fn replace_session(&self, session: Session) {
        self.auth.send_replace(AuthState::Authenticated(session));
    }

    fn clear(&self) {
        self.auth.send_replace(AuthState::Anonymous);
        self.profile.send_replace(None);
    }
}

pub struct AuthStateListener {
    state: Arc<UserState>,
    profiles: ProfileUseCases,
}

impl AuthStateListener {
    pub fn new(state: Arc<UserState>, profiles: ProfileUseCases) -> Self {
        Self { state, profiles }
    }

    pub async fn apply(&self, event: AuthEvent) {
        tracing::debug!(event = event.name(), "Applying auth event");
        match event {
            AuthEvent::SignedOut => self.sign_out(),
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                self.accept(session, false).await
            }
            AuthEvent::UserUpdated(session) => self.accept(session, true).await,
        }
    }

    /// Brings the state in line with whatever the store holds right now.
    pub async fn resync(&self, store: &dyn TokenStore) {
        match store.session() {
            Some(session) => self.accept(session, false).await,
            None => self.sign_out(),
        }
    }

    /// Runs the listener on its own task until the returned handle is dropped. The
    /// store is read once before the first event.
    pub fn spawn(
        self,
        store: Arc<dyn TokenStore>,
        mut events: broadcast::Receiver<AuthEvent>,
    ) -> Subscription {
        let handle = tokio::spawn(async move {
            self.resync(&*store).await;
            loop {
                match events.recv().await {
                    Ok(event) => self.apply(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth listener fell behind, resyncing from store");
                        self.resync(&*store).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }

    async fn accept(&self, session: Session, refetch: bool) {
        if session.is_expired_at(Utc::now()) {
            tracing::info!(user_id = %session.user_id, "Ignoring expired session");
            self.sign_out();
            return;
        }

        let same_user = match self.state.auth_state() {
            AuthState::Authenticated(current) => current.is_same_user(&session),
            AuthState::Anonymous | AuthState::Transitioning => false,
        };

        if same_user && !refetch {
            self.state.replace_session(session);
            return;
        }

        if !same_user {
            self.state.begin_transition();
        }
        let profile = match self.profiles.load_for_session(&session).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::error!(error = %err, user_id = %session.user_id, "Failed to load profile");
                // Keep what we had for the same user rather than blanking the page.
                if same_user { self.state.profile() } else { None }
            }
        };
        tracing::info!(user_id = %session.user_id, "Authenticated");
        self.state.authenticate(session, profile);
    }

    fn sign_out(&self) {
        if !matches!(self.state.auth_state(), AuthState::Anonymous) {
            tracing::info!("Signed out, clearing user state");
        }
        self.state.clear();
    }
}

/// Live listener task. Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::token_store::MemoryTokenStore;
    use crate::test_utils::{InMemoryAvatarStorage, InMemoryProfileRepo, mint_session};

    fn listener() -> (Arc<UserState>, Arc<InMemoryProfileRepo>, AuthStateListener) {
        let state = Arc::new(UserState::new());
        let repo = Arc::new(InMemoryProfileRepo::new());
        let profiles = ProfileUseCases::new(
            repo.clone(),
            Arc::new(InMemoryAvatarStorage::new()),
            2 * 1024 * 1024,
        );
        let listener = AuthStateListener::new(state.clone(), profiles);
        (state, repo, listener)
    }

    #[tokio::test]
    async fn sign_in_authenticates_with_one_profile_fetch() {
        let (state, repo, listener) = listener();
        let session = mint_session("a@b.com", Some("Taro"), 3600);

        listener.apply(AuthEvent::SignedIn(session.clone())).await;

        let AuthState::Authenticated(current) = state.auth_state() else {
            panic!("expected authenticated state");
        };
        assert_eq!(current.user_id, session.user_id);
        assert_eq!(repo.fetches(), 1);
        assert_eq!(state.profile().unwrap().name, "Taro");
    }

    #[tokio::test]
    async fn sign_out_clears_user_state() {
        let (state, _, listener) = listener();
        listener
            .apply(AuthEvent::SignedIn(mint_session("a@b.com", None, 3600)))
            .await;

        listener.apply(AuthEvent::SignedOut).await;

        assert!(matches!(state.auth_state(), AuthState::Anonymous));
        assert!(state.profile().is_none());
    }

    #[tokio::test]
    async fn refresh_for_same_user_skips_refetch() {
        let (state, repo, listener) = listener();
        let session = mint_session("a@b.com", None, 3600);
        listener.apply(AuthEvent::SignedIn(session.clone())).await;

        let mut refreshed = session.clone();
        refreshed.expires_at = session.expires_at + chrono::Duration::hours(1);
        listener
            .apply(AuthEvent::TokenRefreshed(refreshed.clone()))
            .await;

        assert_eq!(repo.fetches(), 1);
        assert_eq!(
            state.auth_state().session().unwrap().expires_at,
            refreshed.expires_at
        );
    }

    #[tokio::test]
    async fn user_update_refetches_profile() {
        let (state, repo, listener) = listener();
        let session = mint_session("a@b.com", Some("Taro"), 3600);
        listener.apply(AuthEvent::SignedIn(session.clone())).await;
        repo.rename(session.user_id, "Jiro");

        listener.apply(AuthEvent::UserUpdated(session)).await;

        assert_eq!(repo.fetches(), 2);
        assert_eq!(state.profile().unwrap().name, "Jiro");
    }

    #[tokio::test]
    async fn expired_session_never_authenticates() {
        let (state, repo, listener) = listener();

        listener
            .apply(AuthEvent::SignedIn(mint_session("a@b.com", None, -5)))
            .await;

        assert!(matches!(state.auth_state(), AuthState::Anonymous));
        assert_eq!(repo.fetches(), 0);
    }

    #[tokio::test]
    async fn spawned_listener_reads_store_then_follows_events() {
        let (state, _, listener) = listener();
        let store = Arc::new(MemoryTokenStore::new());
        store.set_session(mint_session("a@b.com", None, 3600));
        let (events, receiver) = broadcast::channel(8);

        let subscription = listener.spawn(store, receiver);
        let mut auth = state.watch_auth();
        tokio::time::timeout(Duration::from_secs(2), auth.wait_for(|s| s.is_authenticated()))
            .await
            .unwrap()
            .unwrap();

        events.send(AuthEvent::SignedOut).unwrap();
        tokio::time::timeout(
            Duration::from_secs(2),
            auth.wait_for(|s| matches!(s, AuthState::Anonymous)),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(subscription.is_active());
    }

    #[tokio::test]
    async fn dropping_subscription_stops_listener() {
        let (state, _, listener) = listener();
        let store = Arc::new(MemoryTokenStore::new());
        let (events, receiver) = broadcast::channel(8);

        let subscription = listener.spawn(store, receiver);
        drop(subscription);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(events.receiver_count(), 0);
        let _ = events.send(AuthEvent::SignedIn(mint_session("a@b.com", None, 3600)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!state.auth_state().is_authenticated());
    }
}
