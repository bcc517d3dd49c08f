//! Identity provider client for GoTrue-compatible hosted auth APIs.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    application::{
        app_error::{AuthError, AuthResult},
        jwt,
        use_cases::auth::{IdentityProvider, SignUpRequest},
    },
    domain::entities::session::Session,
    infra::http_client,
};

const MAX_ERROR_BODY_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    SignUp,
    Password,
    Exchange,
    Refresh,
    UpdateUser,
    Logout,
}

pub struct GoTrueIdentityProvider {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
    jwt_secret: SecretString,
}

impl GoTrueIdentityProvider {
    pub fn new(base_url: Url, anon_key: SecretString, jwt_secret: SecretString) -> Self {
        Self {
            client: http_client::build_client(),
            base_url,
            anon_key,
            jwt_secret,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/auth/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        );
        self.client
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret())
    }

    async fn send(&self, op: Operation, builder: RequestBuilder) -> AuthResult<Response> {
        let response = builder.send().await.map_err(transport)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let err = classify(op, status, &body);
        tracing::warn!(operation = ?op, status = status.as_u16(), error = %err, "Identity provider rejected request");
        Err(err)
    }

    async fn session(&self, op: Operation, builder: RequestBuilder) -> AuthResult<Session> {
        let tokens: TokenResponse = self
            .send(op, builder)
            .await?
            .json()
            .await
            .map_err(transport)?;

        jwt::decode_session(&tokens.access_token, &tokens.refresh_token, &self.jwt_secret).map_err(
            |e| {
                tracing::error!(error = %e, "Provider issued an access token we cannot verify");
                AuthError::Provider {
                    status: StatusCode::OK.as_u16(),
                    message: "unverifiable access token".into(),
                }
            },
        )
    }
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
    code_challenge: &'a str,
    code_challenge_method: &'static str,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct UpdateUserBody<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// GoTrue reports errors in two shapes depending on the endpoint and version.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> &str {
        self.error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    fn message(&self) -> String {
        let msg = self
            .msg
            .as_deref()
            .or(self.error_description.as_deref())
            .unwrap_or("no details");
        msg.chars().take(MAX_ERROR_BODY_LEN).collect()
    }
}

fn transport(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Network(err.to_string())
    }
}

fn classify(op: Operation, status: StatusCode, body: &ErrorBody) -> AuthError {
    let code = body.code();
    let message = body.message().to_lowercase();

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::Provider {
            status: status.as_u16(),
            message: body.message(),
        };
    }

    match op {
        Operation::SignUp | Operation::UpdateUser
            if matches!(code, "user_already_exists" | "email_exists")
                || message.contains("already registered")
                || message.contains("already been registered") =>
        {
            AuthError::Conflict
        }
        Operation::Password => AuthError::InvalidCredentials,
        Operation::Exchange => AuthError::InvalidCode,
        Operation::Refresh => AuthError::SessionExpired,
        Operation::UpdateUser | Operation::Logout if status == StatusCode::UNAUTHORIZED => {
            AuthError::SessionExpired
        }
        _ => AuthError::Provider {
            status: status.as_u16(),
            message: body.message(),
        },
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn sign_up(&self, request: SignUpRequest<'_>) -> AuthResult<()> {
        let body = SignUpBody {
            email: request.email,
            password: request.password,
            data: SignUpData { name: request.name },
            code_challenge: request.code_challenge,
            code_challenge_method: "s256",
        };
        self.send(
            Operation::SignUp,
            self.request(Method::POST, "signup")
                .query(&[("redirect_to", request.redirect_to)])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.session(
            Operation::Password,
            self.request(Method::POST, "token")
                .query(&[("grant_type", "password")])
                .json(&PasswordGrant { email, password }),
        )
        .await
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> AuthResult<Session> {
        self.session(
            Operation::Exchange,
            self.request(Method::POST, "token")
                .query(&[("grant_type", "pkce")])
                .json(&PkceGrant {
                    auth_code: code,
                    code_verifier,
                }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<Session> {
        self.session(
            Operation::Refresh,
            self.request(Method::POST, "token")
                .query(&[("grant_type", "refresh_token")])
                .json(&RefreshGrant { refresh_token }),
        )
        .await
    }

    async fn update_email(
        &self,
        access_token: &str,
        new_email: &str,
        redirect_to: &str,
    ) -> AuthResult<()> {
        self.send(
            Operation::UpdateUser,
            self.request(Method::PUT, "user")
                .bearer_auth(access_token)
                .query(&[("redirect_to", redirect_to)])
                .json(&UpdateUserBody { email: new_email }),
        )
        .await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.send(
            Operation::Logout,
            self.request(Method::POST, "logout").bearer_auth(access_token),
        )
        .await?;
        Ok(())
    }
}
