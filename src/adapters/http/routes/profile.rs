use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, header},
    routing::{get, put},
};

use crate::{
    adapters::http::{app_state::AppState, routes::RequestStore},
    app_error::AppResult,
    application::use_cases::account::ProfileForm,
    domain::entities::user_profile::UserProfile,
};

/// Upper bound on the raw upload body; the avatar size rule itself is enforced by
/// validation so oversized images get a field error rather than a 413.
const AVATAR_BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route(
            "/avatar",
            put(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
}

/// GET /api/profile
async fn get_profile(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(app_state.account.profile(&*store).await?))
}

/// PUT /api/profile
async fn update_profile(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    Json(form): Json<ProfileForm>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(app_state.account.edit_profile(&*store, &form).await?))
}

/// PUT /api/profile/avatar
/// Raw image body; the Content-Type header names the format.
async fn upload_avatar(
    State(app_state): State<AppState>,
    Extension(store): RequestStore,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<UserProfile>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    let profile = app_state
        .account
        .upload_avatar(&*store, content_type.as_deref(), body.to_vec())
        .await?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::adapters::token_store::cookie::{ACCESS_COOKIE, REFRESH_COOKIE};
    use crate::infra::app::create_app;
    use crate::test_utils::TestAppStateBuilder;

    async fn signed_in(server: &TestServer) -> axum_test::TestResponse {
        server
            .post("/api/auth/signin")
            .json(&json!({ "email": "a@b.com", "password": "secret1" }))
            .await
    }

    #[tokio::test]
    async fn profile_requires_session() {
        let (app_state, _) = TestAppStateBuilder::new().build();
        let server = TestServer::new(create_app(app_state)).unwrap();

        let response = server.get("/api/profile").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "SESSION_MISSING");
    }

    #[tokio::test]
    async fn profile_edit_updates_and_returns_profile() {
        let (app_state, _) = TestAppStateBuilder::new()
            .with_user("a@b.com", "secret1")
            .build();
        let server = TestServer::new(create_app(app_state)).unwrap();
        let session = signed_in(&server).await;

        let response = server
            .put("/api/profile")
            .add_cookie(session.cookie(ACCESS_COOKIE))
            .add_cookie(session.cookie(REFRESH_COOKIE))
            .json(&json!({ "name": "Jiro", "introduce": "Hello there" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "Jiro");
        assert_eq!(body["introduce"], "Hello there");
    }

    #[tokio::test]
    async fn overlong_introduction_is_a_field_error() {
        let (app_state, _) = TestAppStateBuilder::new()
            .with_user("a@b.com", "secret1")
            .build();
        let server = TestServer::new(create_app(app_state)).unwrap();
        let session = signed_in(&server).await;

        let response = server
            .put("/api/profile")
            .add_cookie(session.cookie(ACCESS_COOKIE))
            .add_cookie(session.cookie(REFRESH_COOKIE))
            .json(&json!({ "name": "Jiro", "introduce": "x".repeat(501) }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["fields"]["introduce"].is_string());
    }

    #[tokio::test]
    async fn avatar_with_unsupported_type_is_rejected() {
        let (app_state, mocks) = TestAppStateBuilder::new()
            .with_user("a@b.com", "secret1")
            .build();
        let server = TestServer::new(create_app(app_state)).unwrap();
        let session = signed_in(&server).await;

        let response = server
            .put("/api/profile/avatar")
            .add_cookie(session.cookie(ACCESS_COOKIE))
            .add_cookie(session.cookie(REFRESH_COOKIE))
            .content_type("image/gif")
            .bytes(vec![1u8, 2, 3].into())
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(mocks.storage.uploads(), 0);
    }

    #[tokio::test]
    async fn avatar_upload_sets_url() {
        let (app_state, mocks) = TestAppStateBuilder::new()
            .with_user("a@b.com", "secret1")
            .build();
        let server = TestServer::new(create_app(app_state)).unwrap();
        let session = signed_in(&server).await;

        let response = server
            .put("/api/profile/avatar")
            .add_cookie(session.cookie(ACCESS_COOKIE))
            .add_cookie(session.cookie(REFRESH_COOKIE))
            .content_type("image/png")
            .bytes(vec![137u8, 80, 78, 71].into())
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert!(body["avatarUrl"].as_str().unwrap().ends_with(".png"));
        assert_eq!(mocks.storage.uploads(), 1);
    }
}
