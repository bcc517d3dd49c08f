use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_error::{AppError, AuthError, ErrorCode};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        match self {
            AppError::Validation(fields) => (
                status,
                Json(serde_json::json!({
                    "code": ErrorCode::ValidationFailed.as_str(),
                    "fields": fields,
                })),
            )
                .into_response(),
            AppError::Auth(err) => error_resp(status, err.code(), Some(err.user_message())),
            AppError::SubmissionInFlight => error_resp(
                status,
                ErrorCode::SubmissionInFlight,
                Some("This form is already being submitted."),
            ),
            AppError::Database(_) => error_resp(status, ErrorCode::DatabaseError, None),
            AppError::Storage(_) => error_resp(
                status,
                ErrorCode::StorageError,
                Some("The image could not be uploaded. Please try again later."),
            ),
            AppError::NotFound => error_resp(status, ErrorCode::NotFound, None),
            AppError::Internal(_) => error_resp(status, ErrorCode::InternalError, None),
        }
    }
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Auth(auth) => match auth {
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::SessionMissing
            | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthError::InvalidCode => StatusCode::BAD_REQUEST,
            AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Provider { .. } | AuthError::Network(_) => StatusCode::BAD_GATEWAY,
        },
        AppError::SubmissionInFlight => StatusCode::CONFLICT,
        AppError::Storage(_) => StatusCode::BAD_GATEWAY,
        AppError::NotFound => StatusCode::NOT_FOUND,
        AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<&str>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
