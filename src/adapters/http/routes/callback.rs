use axum::{
    Extension, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::adapters::http::{app_state::AppState, routes::RequestStore};

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/callback", get(auth_callback))
}

/// GET /auth/callback?code=...
/// Target of the emailed verification link. Always redirects to the app root; the
/// visitor arrives signed in only if the code could be exchanged.
async fn auth_callback(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let signed_in = app_state
        .account
        .complete_verification(&*store, query.code.as_deref())
        .await
        .is_some();
    tracing::info!(signed_in, "Verification callback handled");

    (
        StatusCode::FOUND,
        [(header::LOCATION, app_state.config.app_origin.to_string())],
    )
}
