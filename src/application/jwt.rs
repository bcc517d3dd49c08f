use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode,
    errors::{Error as JwtError, ErrorKind},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::session::Session;

/// Audience the identity provider stamps on end-user access tokens.
pub const AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Builds a [`Session`] from the provider's token pair.
///
/// The signature and audience are checked; expiry is not, so that an expired but
/// refreshable session can still be recognised and handed to the refresh path.
pub fn decode_session(
    access_token: &str,
    refresh_token: &str,
    secret: &SecretString,
) -> Result<Session, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);
    validation.set_audience(&[AUDIENCE]);

    let claims = decode::<AccessClaims>(
        access_token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )?
    .claims;

    Ok(Session {
        user_id: claims.sub,
        email: claims.email,
        name: claims.user_metadata.name,
        email_verified: claims.user_metadata.email_verified,
        issued_at: timestamp(claims.iat)?,
        expires_at: timestamp(claims.exp)?,
        access_token: SecretString::new(access_token.into()),
        refresh_token: SecretString::new(refresh_token.into()),
    })
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, JwtError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| JwtError::from(ErrorKind::InvalidToken))
}
