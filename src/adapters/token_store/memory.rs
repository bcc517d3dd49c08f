use std::sync::Mutex;

use secrecy::SecretString;

use crate::{application::use_cases::auth::TokenStore, domain::entities::session::Session};

#[derive(Default)]
struct Slots {
    session: Option<Session>,
    code_verifier: Option<SecretString>,
}

/// Token store living in process memory, one per client context.
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: Mutex<Slots>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Slots) -> T) -> T {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut slots)
    }
}

impl TokenStore for MemoryTokenStore {
    fn session(&self) -> Option<Session> {
        self.with(|s| s.session.clone())
    }

    fn set_session(&self, session: Session) {
        self.with(|s| s.session = Some(session));
    }

    fn clear_session(&self) {
        self.with(|s| s.session = None);
    }

    fn code_verifier(&self) -> Option<SecretString> {
        self.with(|s| s.code_verifier.clone())
    }

    fn set_code_verifier(&self, verifier: SecretString) {
        self.with(|s| s.code_verifier = Some(verifier));
    }

    fn clear_code_verifier(&self) {
        self.with(|s| s.code_verifier = None);
    }
}
