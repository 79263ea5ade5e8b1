//! Unified application error model and mapping helpers.
//! Every frontend (HTTP handlers, the authorization guard, bootstrap) reports failures
//! through `AppError`; storage keeps its own `StoreError` and converts at the seam.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::storage::{StoreError, UniqueField};

/// Message shown for every token or guard failure. Callers never learn which check failed.
pub const PERMISSION_DENIED: &str = "Permission Denied";
/// Message shown for every failed login, whether the email or the password was wrong.
pub const BAD_CREDENTIALS: &str = "Incorrect Email or Password";
const INTERNAL_MESSAGE: &str = "internal error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    BadCredentials,
    PermissionDenied,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    Validation { code: String, message: String },
    #[error("auth: {reason:?}")]
    Auth { reason: AuthFailure },
    #[error("{code}: {message}")]
    Conflict { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    /// `detail` is for server-side diagnostics only and is never sent to the client.
    #[error("{code}: {detail}")]
    Internal { code: String, detail: String },
}

impl AppError {
    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, detail: S) -> Self { AppError::Internal { code: code.into(), detail: detail.into() } }
    pub fn bad_credentials() -> Self { AppError::Auth { reason: AuthFailure::BadCredentials } }
    pub fn permission_denied() -> Self { AppError::Auth { reason: AuthFailure::PermissionDenied } }

    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
            AppError::Auth { reason: AuthFailure::BadCredentials } => "bad_credentials",
            AppError::Auth { reason: AuthFailure::PermissionDenied } => "permission_denied",
        }
    }

    /// The message that is safe to show to a client.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::NotFound { message, .. } => message.as_str(),
            AppError::Auth { reason: AuthFailure::BadCredentials } => BAD_CREDENTIALS,
            AppError::Auth { reason: AuthFailure::PermissionDenied } => PERMISSION_DENIED,
            AppError::Internal { .. } => INTERNAL_MESSAGE,
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth { reason: AuthFailure::BadCredentials } => StatusCode::BAD_REQUEST,
            AppError::Auth { reason: AuthFailure::PermissionDenied } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            // Every handler failure that is not a denial or a miss answers 400; the body stays generic.
            AppError::Internal { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal { code, detail } = &self {
            tracing::error!(target: "teller::http", code = %code, "request failed: {detail}");
        }
        let body = ErrorBody { error: self.public_message(), code: self.code_str() };
        (self.http_status(), Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::not_found("not_found", "Record not found"),
            StoreError::Conflict(UniqueField::Email) => AppError::conflict("email_conflict", "Email in use"),
            StoreError::Conflict(UniqueField::Username) => AppError::conflict("username_conflict", "Username in use"),
            StoreError::Conflict(UniqueField::AccountNumber) => AppError::conflict("account_conflict", "Account number in use"),
            StoreError::UnknownReferrer => AppError::validation("unknown_referrer", "Referrer does not exist"),
            StoreError::EmptyUpdate => AppError::validation("empty_update", "No updatable fields supplied"),
            other => AppError::internal("storage_error", other.to_string().as_str()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), detail: format!("{err:#}") }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal { code: "task_failed".into(), detail: err.to_string() }
    }
}
