use std::sync::Arc;

use crate::{
    application::{in_flight::InFlight, use_cases::account::AccountUseCases},
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub account: Arc<AccountUseCases>,
    /// Sign-ups still waiting on the provider, keyed by normalized email.
    pub sign_ups: Arc<InFlight<String>>,
}
