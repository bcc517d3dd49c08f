use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use uuid::Uuid;

/// Proof of authentication issued by the identity provider.
///
/// A session is never edited in place: refresh and sign-out replace it wholesale.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    /// Display name carried in the provider's user metadata, if any.
    pub name: Option<String>,
    pub email_verified: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True when the session expires within `margin` of `now` and should be refreshed.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }

    pub fn is_same_user(&self, other: &Session) -> bool {
        self.user_id == other.user_id
    }
}
