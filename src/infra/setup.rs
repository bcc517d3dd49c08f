use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        http::app_state::AppState, identity::GoTrueIdentityProvider,
        storage::ObjectStorageAvatarStorage,
    },
    application::{
        in_flight::InFlight,
        use_cases::{
            account::AccountUseCases,
            auth::{AuthGateway, IdentityProvider},
            profile::{AvatarStorage, ProfileRepo, ProfileUseCases},
        },
    },
    infra::{config::AppConfig, postgres_persistence},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let provider = Arc::new(GoTrueIdentityProvider::new(
        config.provider_url.clone(),
        config.provider_anon_key.clone(),
        config.provider_jwt_secret.clone(),
    ));
    let storage = Arc::new(ObjectStorageAvatarStorage::new(
        config.provider_url.clone(),
        config.provider_anon_key.clone(),
        config.avatar_bucket.clone(),
    ));

    Ok(build_app_state(
        config,
        provider,
        postgres_arc as Arc<dyn ProfileRepo>,
        storage,
    ))
}

/// Wires the use cases around already-built adapters.
pub fn build_app_state(
    config: AppConfig,
    provider: Arc<dyn IdentityProvider>,
    profile_repo: Arc<dyn ProfileRepo>,
    avatar_storage: Arc<dyn AvatarStorage>,
) -> AppState {
    let gateway = AuthGateway::new(provider, config.auth_timeout, config.callback_url());
    let profiles = ProfileUseCases::new(profile_repo, avatar_storage, config.avatar_max_bytes);

    AppState {
        config: Arc::new(config),
        account: Arc::new(AccountUseCases::new(gateway, profiles)),
        sign_ups: Arc::new(InFlight::new()),
    }
}

pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "profile_auth=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log")?;
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
    Ok(())
}
