use std::sync::Mutex;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    application::{jwt, use_cases::auth::TokenStore},
    domain::entities::session::Session,
};

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";
pub const VERIFIER_COOKIE: &str = "sb-code-verifier";

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub domain: Option<String>,
    /// Lifetime of the token cookies. Outlives the access token so an expired
    /// session can still be refreshed.
    pub session_ttl: time::Duration,
    pub verifier_ttl: time::Duration,
}

struct Inner {
    jar: CookieJar,
    session: Option<Session>,
}

/// Request-scoped token store backed by the request's cookies.
///
/// Reads come from the decoded session; writes are collected in the jar and must be
/// sent back with the response (see [`CookieTokenStore::jar`]).
pub struct CookieTokenStore {
    inner: Mutex<Inner>,
    settings: CookieSettings,
}

impl CookieTokenStore {
    /// Decodes the session cookies. Cookies that fail signature or audience checks,
    /// or come without their pair, are removed.
    pub fn from_jar(jar: CookieJar, jwt_secret: &SecretString, settings: CookieSettings) -> Self {
        let access = jar.get(ACCESS_COOKIE).map(|c| c.value().to_owned());
        let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned());

        let session = match (access, refresh) {
            (Some(access), Some(refresh)) => match jwt::decode_session(&access, &refresh, jwt_secret)
            {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::debug!(error = %err, "Dropping undecodable session cookies");
                    None
                }
            },
            _ => None,
        };

        let store = Self {
            inner: Mutex::new(Inner { jar, session }),
            settings,
        };
        if store.session().is_none() && store.has_session_cookies() {
            store.clear_session();
        }
        store
    }

    /// Cookie changes made during the request, to be returned with the response.
    pub fn jar(&self) -> CookieJar {
        self.lock().jar.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn has_session_cookies(&self) -> bool {
        let inner = self.lock();
        inner.jar.get(ACCESS_COOKIE).is_some() || inner.jar.get(REFRESH_COOKIE).is_some()
    }

    fn cookie(&self, name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .http_only(true)
            .secure(self.settings.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age);
        if let Some(domain) = &self.settings.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    fn removal(&self, name: &'static str) -> Cookie<'static> {
        self.cookie(name, String::new(), time::Duration::ZERO)
    }
}

impl TokenStore for CookieTokenStore {
    fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn set_session(&self, session: Session) {
        let access = self.cookie(
            ACCESS_COOKIE,
            session.access_token.expose_secret().to_string(),
            self.settings.session_ttl,
        );
        let refresh = self.cookie(
            REFRESH_COOKIE,
            session.refresh_token.expose_secret().to_string(),
            self.settings.session_ttl,
        );

        let mut inner = self.lock();
        inner.jar = inner.jar.clone().add(access).add(refresh);
        inner.session = Some(session);
    }

    fn clear_session(&self) {
        let access = self.removal(ACCESS_COOKIE);
        let refresh = self.removal(REFRESH_COOKIE);

        let mut inner = self.lock();
        inner.jar = inner.jar.clone().remove(access).remove(refresh);
        inner.session = None;
    }

    fn code_verifier(&self) -> Option<SecretString> {
        self.lock()
            .jar
            .get(VERIFIER_COOKIE)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::new(v.into()))
    }

    fn set_code_verifier(&self, verifier: SecretString) {
        let cookie = self.cookie(
            VERIFIER_COOKIE,
            verifier.expose_secret().to_string(),
            self.settings.verifier_ttl,
        );
        let mut inner = self.lock();
        inner.jar = inner.jar.clone().add(cookie);
    }

    fn clear_code_verifier(&self) {
        let cookie = self.removal(VERIFIER_COOKIE);
        let mut inner = self.lock();
        if inner.jar.get(VERIFIER_COOKIE).is_some() {
            inner.jar = inner.jar.clone().remove(cookie);
        }
    }
}
