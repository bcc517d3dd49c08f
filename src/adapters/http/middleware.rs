use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    adapters::{http::app_state::AppState, token_store::CookieTokenStore},
    application::use_cases::session::{SessionStatus, ensure_fresh},
};

/// Loads the session cookies, refreshes them when they are about to expire and hands
/// the store to the handler. Cookie changes made by either are written to the
/// response afterwards.
///
/// Never rejects a request: a session that cannot be refreshed is dropped and the
/// request continues anonymously.
pub async fn session_middleware(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &app_state.config;
    let store = Arc::new(CookieTokenStore::from_jar(
        jar,
        &config.provider_jwt_secret,
        config.cookie_settings(),
    ));

    let status = ensure_fresh(
        app_state.account.gateway(),
        &*store,
        config.session_refresh_margin,
    )
    .await;
    match &status {
        SessionStatus::Refreshed(session) => {
            tracing::debug!(user_id = %session.user_id, "Session refreshed before handler")
        }
        SessionStatus::Cleared => tracing::debug!("Stale session cleared"),
        SessionStatus::Anonymous | SessionStatus::Valid(_) => {}
    }

    request.extensions_mut().insert(store.clone());
    let response = next.run(request).await;

    (store.jar(), response).into_response()
}
