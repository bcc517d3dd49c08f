//! In-process client context.
//!
//! An [`AuthClient`] plays the part of one browser tab: it keeps its own tokens in
//! memory, owns a gateway with a private event bus and runs at most one auth state
//! listener feeding its [`UserState`]. Form submissions go through the same account
//! flows as the HTTP API, one at a time per form.

use std::sync::Arc;

use crate::{
    adapters::token_store::MemoryTokenStore,
    application::{
        app_error::{AppResult, AuthError},
        auth_state::{AuthStateListener, Subscription, UserState},
        in_flight::InFlight,
        use_cases::{
            account::{AccountUseCases, EmailChangeForm, ProfileForm, SignInForm, SignUpForm},
            auth::{PendingVerification, TokenStore},
            session::ensure_fresh,
        },
    },
    domain::entities::{session::Session, user_profile::UserProfile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientForm {
    SignUp,
    SignIn,
    SignOut,
    EmailChange,
    ProfileEdit,
    Avatar,
    Verification,
}

/// Outcome of a form submission from the client.
#[derive(Debug)]
pub enum Submission<T> {
    Completed(T),
    /// The same form was already being submitted; nothing was sent.
    Ignored,
}

impl<T> Submission<T> {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Submission::Ignored)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Submission::Completed(value) => Some(value),
            Submission::Ignored => None,
        }
    }
}

pub struct AuthClient {
    store: Arc<MemoryTokenStore>,
    account: AccountUseCases,
    state: Arc<UserState>,
    subscription: Option<Subscription>,
    in_flight: InFlight<ClientForm>,
    refresh_margin: chrono::Duration,
}

impl AuthClient {
    /// New signed-out context sharing the provider and profile store of `account`.
    /// Sessions expiring within `refresh_margin` are refreshed before protected forms.
    pub fn new(account: &AccountUseCases, refresh_margin: chrono::Duration) -> Self {
        let gateway = account.gateway().detached();
        Self {
            store: Arc::new(MemoryTokenStore::new()),
            account: AccountUseCases::new(gateway, account.profiles().clone()),
            state: Arc::new(UserState::new()),
            subscription: None,
            in_flight: InFlight::new(),
            refresh_margin,
        }
    }

    pub fn state(&self) -> &Arc<UserState> {
        &self.state
    }

    pub fn store(&self) -> &dyn TokenStore {
        &*self.store
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Starts the auth state listener. A previous listener is stopped first.
    pub fn mount(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!("Replacing auth state listener");
        }

        let events = self.account.gateway().subscribe();
        let listener =
            AuthStateListener::new(self.state.clone(), self.account.profiles().clone());
        self.subscription = Some(listener.spawn(self.store.clone(), events));
    }

    pub fn unmount(&mut self) {
        self.subscription = None;
    }

    /// Refreshes the stored session if it is about to expire. A session that cannot
    /// be refreshed is dropped and the form is refused.
    async fn require_session(&self) -> AppResult<Session> {
        let status = ensure_fresh(self.account.gateway(), &*self.store, self.refresh_margin).await;
        status
            .session()
            .cloned()
            .ok_or_else(|| AuthError::SessionMissing.into())
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> AppResult<Submission<PendingVerification>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::SignUp) else {
            return Ok(Submission::Ignored);
        };
        let pending = self.account.sign_up(&*self.store, form).await?;
        Ok(Submission::Completed(pending))
    }

    pub async fn sign_in(&self, form: &SignInForm) -> AppResult<Submission<Session>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::SignIn) else {
            return Ok(Submission::Ignored);
        };
        let session = self.account.sign_in(&*self.store, form).await?;
        Ok(Submission::Completed(session))
    }

    pub async fn sign_out(&self) -> Submission<()> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::SignOut) else {
            return Submission::Ignored;
        };
        self.account.sign_out(&*self.store).await;
        Submission::Completed(())
    }

    pub async fn change_email(
        &self,
        form: &EmailChangeForm,
    ) -> AppResult<Submission<PendingVerification>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::EmailChange) else {
            return Ok(Submission::Ignored);
        };
        self.require_session().await?;
        let pending = self.account.change_email(&*self.store, form).await?;
        Ok(Submission::Completed(pending))
    }

    pub async fn edit_profile(&self, form: &ProfileForm) -> AppResult<Submission<UserProfile>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::ProfileEdit) else {
            return Ok(Submission::Ignored);
        };
        self.require_session().await?;
        let profile = self.account.edit_profile(&*self.store, form).await?;
        Ok(Submission::Completed(profile))
    }

    pub async fn upload_avatar(
        &self,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> AppResult<Submission<UserProfile>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::Avatar) else {
            return Ok(Submission::Ignored);
        };
        self.require_session().await?;
        let profile = self
            .account
            .upload_avatar(&*self.store, content_type, bytes)
            .await?;
        Ok(Submission::Completed(profile))
    }

    /// Follows an emailed verification link opened in this context.
    pub async fn complete_verification(&self, code: Option<&str>) -> Submission<Option<Session>> {
        let Some(_ticket) = self.in_flight.try_begin(ClientForm::Verification) else {
            return Submission::Ignored;
        };
        Submission::Completed(self.account.complete_verification(&*self.store, code).await)
    }
}
