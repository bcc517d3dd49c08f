use strum::IntoStaticStr;

use crate::domain::entities::session::Session;

/// Change in authentication state, published by the auth gateway.
#[derive(Debug, Clone, IntoStaticStr)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(Session),
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
