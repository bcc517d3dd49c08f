use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::get_env_default;
use secrecy::SecretString;
use time::Duration;
use url::Url;

use crate::{adapters::token_store::CookieSettings, infra::error::InfraError};

const DEFAULT_AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;

pub struct AppConfig {
    /// Base URL of the hosted identity/storage backend.
    pub provider_url: Url,
    /// Public (anon) API key sent with every provider request.
    pub provider_anon_key: SecretString,
    /// Secret the provider signs access tokens with.
    pub provider_jwt_secret: SecretString,
    pub database_url: String,
    /// Where the verification callback sends visitors afterwards.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub auth_timeout: std::time::Duration,
    pub session_refresh_margin: chrono::Duration,
    pub cookie_secure: bool,
    pub cookie_domain: Option<String>,
    pub refresh_token_ttl: Duration,
    pub code_verifier_ttl: Duration,
    pub avatar_bucket: String,
    pub avatar_max_bytes: usize,
}

impl AppConfig {
    /// Reads the configuration from the environment. The provider settings and the
    /// database URL have no defaults; a missing one is a startup error.
    pub fn from_env() -> Result<Self, InfraError> {
        let provider_url = parse_url("PROVIDER_URL", &required("PROVIDER_URL")?)?;
        let provider_anon_key = SecretString::new(required("PROVIDER_ANON_KEY")?.into());
        let provider_jwt_secret = SecretString::new(required("PROVIDER_JWT_SECRET")?.into());
        let database_url = required("DATABASE_URL")?;

        let app_origin = parse_url(
            "APP_ORIGIN",
            &get_env_default("APP_ORIGIN", String::from("http://localhost:3000")),
        )?;
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", app_origin.origin().ascii_serialization())
                .parse()
                .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );

        let auth_timeout_secs: u64 = get_env_default("AUTH_TIMEOUT_SECS", 10);
        let refresh_margin_secs: i64 = get_env_default("SESSION_REFRESH_MARGIN_SECS", 10);
        let cookie_secure: bool = get_env_default("COOKIE_SECURE", true);
        let cookie_domain: Option<String> = std::env::var("COOKIE_DOMAIN")
            .ok()
            .filter(|d| !d.trim().is_empty());
        let refresh_token_ttl_days: i64 = get_env_default("REFRESH_TOKEN_TTL_DAYS", 30);
        let code_verifier_ttl_minutes: i64 = get_env_default("CODE_VERIFIER_TTL_MINUTES", 60);
        let avatar_bucket: String = get_env_default("AVATAR_BUCKET", "avatars".to_string());
        let avatar_max_bytes: usize = get_env_default("AVATAR_MAX_BYTES", DEFAULT_AVATAR_MAX_BYTES);

        if auth_timeout_secs == 0 {
            return Err(InfraError::ConfigInvalid {
                var: "AUTH_TIMEOUT_SECS",
            });
        }

        Ok(Self {
            provider_url,
            provider_anon_key,
            provider_jwt_secret,
            database_url,
            app_origin,
            cors_origin,
            bind_addr,
            auth_timeout: std::time::Duration::from_secs(auth_timeout_secs),
            session_refresh_margin: chrono::Duration::seconds(refresh_margin_secs),
            cookie_secure,
            cookie_domain,
            refresh_token_ttl: Duration::days(refresh_token_ttl_days),
            code_verifier_ttl: Duration::minutes(code_verifier_ttl_minutes),
            avatar_bucket,
            avatar_max_bytes,
        })
    }

    /// Redirect target for emailed verification links.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/auth/callback",
            self.app_origin.as_str().trim_end_matches('/')
        )
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            secure: self.cookie_secure,
            domain: self.cookie_domain.clone(),
            session_ttl: self.refresh_token_ttl,
            verifier_ttl: self.code_verifier_ttl,
        }
    }
}

fn required(var: &'static str) -> Result<String, InfraError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(InfraError::ConfigMissing { var }),
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, InfraError> {
    Url::parse(raw).map_err(|_| InfraError::ConfigInvalid { var })
}
