//! In-memory identity provider.
//!
//! Behaves like the hosted provider as far as the gateway can observe: PKCE-checked,
//! single-use verification codes, rotating refresh tokens and signed access tokens.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::{
        app_error::{AuthError, AuthResult},
        jwt::decode_session,
        pkce,
        use_cases::auth::{IdentityProvider, SignUpRequest},
    },
    domain::entities::session::Session,
    test_utils::{issue_access_token, test_secret},
};

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub confirmed: bool,
    pub code_challenge: Option<String>,
    pub pending_email: Option<String>,
}

#[derive(Default)]
struct ProviderState {
    users: HashMap<String, MockUser>,
    /// Unconsumed verification code → email.
    codes: HashMap<String, String>,
    refresh_tokens: HashMap<String, Uuid>,
}

pub struct InMemoryIdentityProvider {
    state: Mutex<ProviderState>,
    calls: AtomicUsize,
    session_ttl_secs: AtomicI64,
    delay: Mutex<Option<Duration>>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            calls: AtomicUsize::new(0),
            session_ttl_secs: AtomicI64::new(3600),
            delay: Mutex::new(None),
        }
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already confirmed user.
    pub fn with_user(self, email: &str, password: &str) -> Self {
        self.state.lock().unwrap().users.insert(
            email.to_string(),
            MockUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password: password.to_string(),
                name: None,
                confirmed: true,
                code_challenge: None,
                pending_email: None,
            },
        );
        self
    }

    /// Simulates the user opening the verification email: confirms the address and
    /// returns the one-time code carried by the link.
    pub fn issue_code(&self, email: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(email)
            .expect("issue_code for unknown user");
        user.confirmed = true;
        let code = format!("code-{}", Uuid::new_v4());
        state.codes.insert(code.clone(), email.to_string());
        code
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_session_ttl_secs(&self, ttl_secs: i64) {
        self.session_ttl_secs.store(ttl_secs, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().unwrap().refresh_tokens.clear();
    }

    pub fn pending_email(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(email)
            .and_then(|u| u.pending_email.clone())
    }

    pub fn user_id(&self, email: &str) -> Option<Uuid> {
        self.state.lock().unwrap().users.get(email).map(|u| u.id)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn issue_session(&self, state: &mut ProviderState, user: &MockUser) -> Session {
        let ttl = self.session_ttl_secs.load(Ordering::SeqCst);
        let access = issue_access_token(user.id, &user.email, user.name.as_deref(), ttl);
        let refresh = format!("refresh-{}", Uuid::new_v4());
        state.refresh_tokens.insert(refresh.clone(), user.id);
        decode_session(&access, &refresh, &test_secret()).unwrap()
    }

    fn user_for_token(&self, access_token: &str) -> AuthResult<Uuid> {
        decode_session(access_token, "", &test_secret())
            .map(|s| s.user_id)
            .map_err(|_| AuthError::SessionExpired)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, request: SignUpRequest<'_>) -> AuthResult<()> {
        self.enter().await;
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(request.email) {
            return Err(AuthError::Conflict);
        }
        state.users.insert(
            request.email.to_string(),
            MockUser {
                id: Uuid::new_v4(),
                email: request.email.to_string(),
                password: request.password.to_string(),
                name: request.name.map(str::to_string),
                confirmed: false,
                code_challenge: Some(request.code_challenge.to_string()),
                pending_email: None,
            },
        );
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.enter().await;
        let mut state = self.state.lock().unwrap();
        let user = match state.users.get(email) {
            Some(u) if u.confirmed && u.password == password => u.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        Ok(self.issue_session(&mut state, &user))
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> AuthResult<Session> {
        self.enter().await;
        let mut state = self.state.lock().unwrap();
        let email = state.codes.remove(code).ok_or(AuthError::InvalidCode)?;
        let user = state.users.get(&email).cloned().ok_or(AuthError::InvalidCode)?;
        if let Some(challenge) = &user.code_challenge
            && *challenge != pkce::challenge(code_verifier)
        {
            return Err(AuthError::InvalidCode);
        }
        Ok(self.issue_session(&mut state, &user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<Session> {
        self.enter().await;
        let mut state = self.state.lock().unwrap();
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AuthError::SessionExpired)?;
        let user = state
            .users
            .values()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(AuthError::SessionExpired)?;
        Ok(self.issue_session(&mut state, &user))
    }

    async fn update_email(
        &self,
        access_token: &str,
        new_email: &str,
        _redirect_to: &str,
    ) -> AuthResult<()> {
        self.enter().await;
        let user_id = self.user_for_token(access_token)?;
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(new_email) {
            return Err(AuthError::Conflict);
        }
        let user = state
            .users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::SessionExpired)?;
        user.pending_email = Some(new_email.to_string());
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.enter().await;
        let user_id = self.user_for_token(access_token)?;
        self.state
            .lock()
            .unwrap()
            .refresh_tokens
            .retain(|_, owner| *owner != user_id);
        Ok(())
    }
}
