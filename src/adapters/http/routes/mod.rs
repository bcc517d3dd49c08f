pub mod auth;
pub mod callback;
pub mod health;
pub mod profile;

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use crate::adapters::{http::app_state::AppState, token_store::CookieTokenStore};

/// The request's token store, installed by the session middleware.
pub type RequestStore = Extension<Arc<CookieTokenStore>>;

/// Routes that run behind the session middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/session", get(auth::current_session))
                .nest("/auth", auth::router())
                .nest("/profile", profile::router()),
        )
        .nest("/auth", callback::router())
}
