use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::{
    application::{
        app_error::{AuthError, AuthResult},
        pkce,
    },
    domain::entities::{auth_event::AuthEvent, session::Session},
};

const EVENT_CAPACITY: usize = 32;

/// Sign-up or email change accepted; the address must be confirmed before a session exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingVerification {
    pub email: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: Option<&'a str>,
    pub code_challenge: &'a str,
    pub redirect_to: &'a str,
}

/// Hosted identity provider. Credential storage, email delivery and token signing
/// all happen on the other side of this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: SignUpRequest<'_>) -> AuthResult<()>;
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session>;
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> AuthResult<Session>;
    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<Session>;
    async fn update_email(
        &self,
        access_token: &str,
        new_email: &str,
        redirect_to: &str,
    ) -> AuthResult<()>;
    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;
}

/// Where the current session's credentials live (cookies server-side, memory in a
/// client context). Writes replace the previous value; last write wins.
pub trait TokenStore: Send + Sync {
    fn session(&self) -> Option<Session>;
    fn set_session(&self, session: Session);
    fn clear_session(&self);
    fn code_verifier(&self) -> Option<SecretString>;
    fn set_code_verifier(&self, verifier: SecretString);
    fn clear_code_verifier(&self);
}

/// Wraps the identity provider: bounds every call, keeps the token store in step
/// with the provider and publishes an [`AuthEvent`] for each state change.
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
    events: broadcast::Sender<AuthEvent>,
    timeout: Duration,
    redirect_to: String,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, timeout: Duration, redirect_to: String) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            events,
            timeout,
            redirect_to,
        }
    }

    /// Same provider and settings, separate event channel.
    pub fn detached(&self) -> Self {
        Self::new(self.provider.clone(), self.timeout, self.redirect_to.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    #[instrument(skip(self, store, password, name))]
    pub async fn sign_up(
        &self,
        store: &dyn TokenStore,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> AuthResult<PendingVerification> {
        let verifier = pkce::generate_verifier();
        let code_challenge = pkce::challenge(&verifier);
        let request = SignUpRequest {
            email,
            password,
            name,
            code_challenge: &code_challenge,
            redirect_to: &self.redirect_to,
        };

        self.bounded("sign_up", self.provider.sign_up(request)).await?;
        store.set_code_verifier(SecretString::new(verifier.into()));

        tracing::info!("Sign-up accepted, verification pending");
        Ok(PendingVerification {
            email: email.to_string(),
        })
    }

    #[instrument(skip(self, store, code))]
    pub async fn exchange_code_for_session(
        &self,
        store: &dyn TokenStore,
        code: &str,
    ) -> AuthResult<Session> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidCode);
        }
        // The verifier only exists in the context that started the sign-up.
        let Some(verifier) = store.code_verifier() else {
            return Err(AuthError::InvalidCode);
        };

        let session = self
            .bounded(
                "exchange_code",
                self.provider.exchange_code(code, verifier.expose_secret()),
            )
            .await?;

        store.clear_code_verifier();
        store.set_session(session.clone());
        tracing::info!(user_id = %session.user_id, "Verification code exchanged for session");
        self.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, store, password))]
    pub async fn sign_in(
        &self,
        store: &dyn TokenStore,
        email: &str,
        password: &str,
    ) -> AuthResult<Session> {
        let session = self
            .bounded(
                "sign_in",
                self.provider.sign_in_with_password(email, password),
            )
            .await?;

        store.set_session(session.clone());
        tracing::info!(user_id = %session.user_id, "Signed in");
        self.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Clears the store whatever the provider says. Calling it without a session is
    /// a no-op apart from the event.
    #[instrument(skip(self, store))]
    pub async fn sign_out(&self, store: &dyn TokenStore) {
        if let Some(session) = store.session() {
            let revoke = self.provider.sign_out(session.access_token.expose_secret());
            if let Err(err) = self.bounded("sign_out", revoke).await {
                tracing::warn!(error = %err, user_id = %session.user_id, "Provider sign-out failed, clearing local session anyway");
            }
        }
        store.clear_session();
        store.clear_code_verifier();
        self.publish(AuthEvent::SignedOut);
    }

    /// Requests an email change, then signs out: the current session still carries the
    /// old address and must not be trusted until the new one is confirmed.
    #[instrument(skip(self, store))]
    pub async fn update_email(
        &self,
        store: &dyn TokenStore,
        new_email: &str,
    ) -> AuthResult<PendingVerification> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;

        self.bounded(
            "update_email",
            self.provider.update_email(
                session.access_token.expose_secret(),
                new_email,
                &self.redirect_to,
            ),
        )
        .await?;

        tracing::info!(user_id = %session.user_id, "Email change requested, forcing sign-out");
        self.sign_out(store).await;
        Ok(PendingVerification {
            email: new_email.to_string(),
        })
    }

    #[instrument(skip(self, store))]
    pub async fn refresh(&self, store: &dyn TokenStore) -> AuthResult<Session> {
        let current = store.session().ok_or(AuthError::SessionMissing)?;

        let session = self
            .bounded(
                "refresh_session",
                self.provider
                    .refresh_session(current.refresh_token.expose_secret()),
            )
            .await?;

        store.set_session(session.clone());
        tracing::debug!(user_id = %session.user_id, expires_at = %session.expires_at, "Session refreshed");
        self.publish(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    /// Drops a session that can no longer be used, without contacting the provider.
    pub fn expire(&self, store: &dyn TokenStore) {
        store.clear_session();
        self.publish(AuthEvent::SignedOut);
    }

    /// Announces that the signed-in user's data changed.
    pub fn notify_user_updated(&self, store: &dyn TokenStore) -> AuthResult<()> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;
        self.publish(AuthEvent::UserUpdated(session));
        Ok(())
    }

    /// Current session as stored; never refreshes.
    pub fn get_session(&self, store: &dyn TokenStore) -> Option<Session> {
        store.session()
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = AuthResult<T>>,
    ) -> AuthResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Identity provider call timed out"
                );
                Err(AuthError::Timeout)
            }
        }
    }

    fn publish(&self, event: AuthEvent) {
        tracing::debug!(event = event.name(), "Auth event");
        // Server-side request contexts usually have no subscribers.
        let _ = self.events.send(event);
    }
}
