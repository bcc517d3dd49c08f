//! Form-driven account flows.
//!
//! Each flow validates its form first and only then talks to the identity provider or
//! the profile store, so a rejected form never costs a network round trip.

use serde::Deserialize;
use tracing::instrument;

use crate::{
    application::{
        app_error::{AppResult, AuthError},
        use_cases::{
            auth::{AuthGateway, PendingVerification, TokenStore},
            profile::ProfileUseCases,
        },
        validators::{FormInput, FormKind, schema_for, validate},
    },
    domain::entities::{session::Session, user_profile::UserProfile},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl SignUpForm {
    fn input(&self) -> FormInput<'_> {
        FormInput::from([
            ("email", self.email.trim()),
            ("password", self.password.as_str()),
            ("name", self.name.as_deref().unwrap_or_default().trim()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    fn input(&self) -> FormInput<'_> {
        FormInput::from([
            ("email", self.email.trim()),
            ("password", self.password.as_str()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailChangeForm {
    pub new_email: String,
    pub new_email_confirm: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub introduce: String,
}

impl ProfileForm {
    fn input(&self) -> FormInput<'_> {
        FormInput::from([
            ("name", self.name.trim()),
            ("introduce", self.introduce.as_str()),
        ])
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AccountUseCases {
    gateway: AuthGateway,
    profiles: ProfileUseCases,
}

impl AccountUseCases {
    pub fn new(gateway: AuthGateway, profiles: ProfileUseCases) -> Self {
        Self { gateway, profiles }
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn profiles(&self) -> &ProfileUseCases {
        &self.profiles
    }

    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        store: &dyn TokenStore,
        form: &SignUpForm,
    ) -> AppResult<PendingVerification> {
        validate(schema_for(FormKind::SignUp), &form.input())?;

        let email = normalize_email(&form.email);
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        Ok(self
            .gateway
            .sign_up(store, &email, &form.password, name)
            .await?)
    }

    #[instrument(skip_all)]
    pub async fn sign_in(&self, store: &dyn TokenStore, form: &SignInForm) -> AppResult<Session> {
        validate(schema_for(FormKind::SignIn), &form.input())?;

        let email = normalize_email(&form.email);
        let session = self.gateway.sign_in(store, &email, &form.password).await?;
        if let Err(err) = self.profiles.ensure_for_session(&session).await {
            tracing::error!(error = %err, user_id = %session.user_id, "Failed to ensure profile on sign-in");
        }
        Ok(session)
    }

    pub async fn sign_out(&self, store: &dyn TokenStore) {
        self.gateway.sign_out(store).await;
    }

    /// Requests the change and signs out. The session is checked first because the
    /// current address is part of the form's rules.
    #[instrument(skip_all)]
    pub async fn change_email(
        &self,
        store: &dyn TokenStore,
        form: &EmailChangeForm,
    ) -> AppResult<PendingVerification> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;

        let current_email = normalize_email(&session.email);
        let new_email = normalize_email(&form.new_email);
        let new_email_confirm = normalize_email(&form.new_email_confirm);
        let input = FormInput::from([
            ("new_email", new_email.as_str()),
            ("new_email_confirm", new_email_confirm.as_str()),
            ("current_email", current_email.as_str()),
        ]);
        validate(schema_for(FormKind::EmailChange), &input)?;

        Ok(self.gateway.update_email(store, &new_email).await?)
    }

    #[instrument(skip_all)]
    pub async fn edit_profile(
        &self,
        store: &dyn TokenStore,
        form: &ProfileForm,
    ) -> AppResult<UserProfile> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;
        validate(schema_for(FormKind::ProfileEdit), &form.input())?;

        let profile = self
            .profiles
            .update_details(&session, form.name.trim(), &form.introduce)
            .await?;
        self.gateway.notify_user_updated(store)?;
        Ok(profile)
    }

    #[instrument(skip_all)]
    pub async fn upload_avatar(
        &self,
        store: &dyn TokenStore,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> AppResult<UserProfile> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;

        let profile = self
            .profiles
            .upload_avatar(&session, content_type, bytes)
            .await?;
        self.gateway.notify_user_updated(store)?;
        Ok(profile)
    }

    pub async fn profile(&self, store: &dyn TokenStore) -> AppResult<UserProfile> {
        let session = store.session().ok_or(AuthError::SessionMissing)?;
        self.profiles.get(&session).await
    }

    /// Finishes an emailed verification link. Any failure leaves the caller signed out;
    /// the reason is only logged.
    #[instrument(skip_all)]
    pub async fn complete_verification(
        &self,
        store: &dyn TokenStore,
        code: Option<&str>,
    ) -> Option<Session> {
        let result = match code {
            Some(code) => self.gateway.exchange_code_for_session(store, code).await,
            None => Err(AuthError::InvalidCode),
        };

        let session = match result {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "Verification callback failed, continuing anonymously");
                if store.session().is_some() {
                    self.gateway.expire(store);
                } else {
                    store.clear_session();
                }
                return None;
            }
        };

        if let Err(err) = self.profiles.ensure_for_session(&session).await {
            // The listener creates the row on its first load.
            tracing::error!(error = %err, user_id = %session.user_id, "Failed to create profile after verification");
        }
        Some(session)
    }
}
