//! Test data factories for tokens, sessions and configuration.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::{
    application::jwt::{AUDIENCE, AccessClaims, UserMetadata, decode_session},
    domain::entities::session::Session,
    infra::config::AppConfig,
};

pub const TEST_JWT_SECRET: &str = "test-provider-jwt-secret-0123456789abcdef";

pub fn test_secret() -> SecretString {
    SecretString::new(TEST_JWT_SECRET.into())
}

/// Signs an access token the way the identity provider does. A negative `ttl_secs`
/// yields an already expired token.
pub fn issue_access_token(user_id: Uuid, email: &str, name: Option<&str>, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id,
        email: email.to_string(),
        aud: AUDIENCE.to_string(),
        exp: now + ttl_secs,
        iat: now,
        user_metadata: UserMetadata {
            email_verified: true,
            name: name.map(str::to_string),
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// A verified session for a fresh user id.
pub fn mint_session(email: &str, name: Option<&str>, ttl_secs: i64) -> Session {
    let access = issue_access_token(Uuid::new_v4(), email, name, ttl_secs);
    let refresh = Uuid::new_v4().to_string();
    decode_session(&access, &refresh, &test_secret()).unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        provider_url: Url::parse("http://provider.test").unwrap(),
        provider_anon_key: SecretString::new("test-anon-key".into()),
        provider_jwt_secret: test_secret(),
        database_url: "postgres://unused".to_string(),
        app_origin: Url::parse("http://localhost:3000").unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        auth_timeout: std::time::Duration::from_secs(5),
        session_refresh_margin: chrono::Duration::seconds(10),
        cookie_secure: false,
        cookie_domain: None,
        refresh_token_ttl: time::Duration::days(30),
        code_verifier_ttl: time::Duration::hours(1),
        avatar_bucket: "avatars".to_string(),
        avatar_max_bytes: 2 * 1024 * 1024,
    }
}
