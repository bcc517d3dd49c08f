use chrono::Utc;
use tracing::instrument;

use crate::{
    application::use_cases::auth::{AuthGateway, TokenStore},
    domain::entities::session::Session,
};

/// Outcome of checking the stored session at the start of a request.
#[derive(Debug, Clone)]
pub enum SessionStatus {
    Anonymous,
    Valid(Session),
    Refreshed(Session),
    /// A session was stored but could not be refreshed; the store is now empty.
    Cleared,
}

impl SessionStatus {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionStatus::Valid(s) | SessionStatus::Refreshed(s) => Some(s),
            SessionStatus::Anonymous | SessionStatus::Cleared => None,
        }
    }
}

/// Makes sure the stored session is usable for at least `margin`, refreshing it if
/// not. Never fails: a session that cannot be refreshed is dropped and the caller
/// continues anonymously.
#[instrument(skip(gateway, store))]
pub async fn ensure_fresh(
    gateway: &AuthGateway,
    store: &dyn TokenStore,
    margin: chrono::Duration,
) -> SessionStatus {
    let Some(session) = gateway.get_session(store) else {
        return SessionStatus::Anonymous;
    };

    if !session.needs_refresh_at(Utc::now(), margin) {
        return SessionStatus::Valid(session);
    }

    match gateway.refresh(store).await {
        Ok(refreshed) => SessionStatus::Refreshed(refreshed),
        Err(err) => {
            tracing::info!(error = %err, user_id = %session.user_id, "Session refresh failed, continuing anonymously");
            gateway.expire(store);
            SessionStatus::Cleared
        }
    }
}
