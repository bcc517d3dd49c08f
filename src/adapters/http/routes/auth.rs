use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, routes::RequestStore},
    app_error::{AppError, AppResult},
    application::use_cases::{
        account::{EmailChangeForm, SignInForm, SignUpForm, normalize_email},
        auth::TokenStore,
    },
    domain::entities::session::Session,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl From<Option<&Session>> for SessionResponse {
    fn from(session: Option<&Session>) -> Self {
        match session {
            Some(s) => SessionResponse {
                authenticated: true,
                user_id: Some(s.user_id),
                email: Some(s.email.clone()),
                expires_at: Some(s.expires_at),
            },
            None => SessionResponse {
                authenticated: false,
                user_id: None,
                email: None,
                expires_at: None,
            },
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/signout", post(sign_out))
        .route("/email", put(change_email))
}

/// GET /api/session
/// Session as seen after the middleware refreshed or cleared it.
pub async fn current_session(Extension(store): RequestStore) -> Json<SessionResponse> {
    Json(store.session().as_ref().into())
}

/// POST /api/auth/signup
/// Accepts the sign-up and leaves the code verifier cookie for the emailed link.
async fn sign_up(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    Json(form): Json<SignUpForm>,
) -> AppResult<impl IntoResponse> {
    let Some(_ticket) = app_state.sign_ups.try_begin(normalize_email(&form.email)) else {
        return Err(AppError::SubmissionInFlight);
    };

    let pending = app_state.account.sign_up(&*store, &form).await?;
    Ok((StatusCode::ACCEPTED, Json(pending)))
}

/// POST /api/auth/signin
async fn sign_in(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    Json(form): Json<SignInForm>,
) -> AppResult<impl IntoResponse> {
    let session = app_state.account.sign_in(&*store, &form).await?;
    Ok(Json(SessionResponse::from(Some(&session))))
}

/// POST /api/auth/signout
async fn sign_out(State(app_state): State<AppState>, Extension(store): RequestStore) -> StatusCode {
    app_state.account.sign_out(&*store).await;
    StatusCode::NO_CONTENT
}

/// PUT /api/auth/email
/// Requests the change and signs the user out until the new address is confirmed.
async fn change_email(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    Json(form): Json<EmailChangeForm>,
) -> AppResult<impl IntoResponse> {
    let pending = app_state.account.change_email(&*store, &form).await?;
    Ok((StatusCode::ACCEPTED, Json(pending)))
}
