use thiserror::Error;

use crate::application::validators::FieldErrors;

/// Failures reported by the identity provider or the gateway wrapping it.
///
/// Display strings may carry provider text and are meant for logs; use
/// [`AuthError::user_message`] for anything shown to a visitor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email address is already registered")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Verification code is invalid, expired or already used")]
    InvalidCode,

    #[error("Identity provider did not answer in time")]
    Timeout,

    #[error("No active session")]
    SessionMissing,

    #[error("Session can no longer be refreshed")]
    SessionExpired,

    #[error("Identity provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::Conflict => ErrorCode::Conflict,
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::InvalidCode => ErrorCode::InvalidCode,
            AuthError::Timeout => ErrorCode::Timeout,
            AuthError::SessionMissing => ErrorCode::SessionMissing,
            AuthError::SessionExpired => ErrorCode::SessionExpired,
            AuthError::Provider { .. } | AuthError::Network(_) => ErrorCode::ProviderUnavailable,
        }
    }

    /// Single banner message, free of provider internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::Conflict => "This email address is already registered.",
            AuthError::InvalidCredentials => "Email address or password is incorrect.",
            AuthError::InvalidCode => "The verification link is invalid or has expired.",
            AuthError::Timeout => "The sign-in service took too long to respond. Please try again.",
            AuthError::SessionMissing => "Please sign in to continue.",
            AuthError::SessionExpired => "Your session has expired. Please sign in again.",
            AuthError::Provider { .. } | AuthError::Network(_) => {
                "An error occurred. Please try again later."
            }
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("A submission for this form is already in progress")]
    SubmissionInFlight,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationFailed,
    Conflict,
    InvalidCredentials,
    InvalidCode,
    Timeout,
    SessionMissing,
    SessionExpired,
    ProviderUnavailable,
    SubmissionInFlight,
    DatabaseError,
    StorageError,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidCode => "INVALID_CODE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::SessionMissing => "SESSION_MISSING",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ErrorCode::SubmissionInFlight => "SUBMISSION_IN_FLIGHT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
