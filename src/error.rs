//! Unified application error model and HTTP mapping.
//! Every failure the account core can surface to a caller is one of these variants;
//! layer-local errors (storage, token) are converted at the registry / middleware boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::identity::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Validation { code: String, message: String, details: FieldErrors },
    Conflict { code: String, message: String },
    InvalidCredentials { code: String, message: String },
    Unauthorized { code: String, message: String },
    NotFound { code: String, message: String },
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

/// Wire shape of every error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::InvalidCredentials { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::InvalidCredentials { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn validation(details: FieldErrors) -> Self {
        AppError::Validation { code: "validation_error".into(), message: "invalid fields".into(), details }
    }
    pub fn conflict<S: Into<String>>(msg: S) -> Self { AppError::Conflict { code: "conflict".into(), message: msg.into() } }
    pub fn invalid_credentials() -> Self {
        AppError::InvalidCredentials { code: "invalid_credentials".into(), message: "handle or secret is incorrect".into() }
    }
    pub fn unauthorized() -> Self {
        AppError::Unauthorized { code: "unauthorized".into(), message: "Authentication required".into() }
    }
    pub fn user_not_found() -> Self { AppError::NotFound { code: "user_not_found".into(), message: "User not found".into() } }
    pub fn storage() -> Self { AppError::Storage { code: "storage_error".into(), message: "storage unavailable".into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { code: "internal_error".into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Conflict { .. } => 409,
            AppError::InvalidCredentials { .. } => 401,
            AppError::Unauthorized { .. } => 401,
            AppError::NotFound { .. } => 404,
            AppError::Storage { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody { error: self.code_str(), message: self.message(), details: self.details() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::validation(FieldErrors::default()).http_status(), 400);
        assert_eq!(AppError::conflict("dup").http_status(), 409);
        assert_eq!(AppError::invalid_credentials().http_status(), 401);
        assert_eq!(AppError::unauthorized().http_status(), 401);
        assert_eq!(AppError::user_not_found().http_status(), 404);
        assert_eq!(AppError::storage().http_status(), 500);
        assert_eq!(AppError::internal("boom").http_status(), 500);
    }

    #[test]
    fn stable_codes() {
        assert_eq!(AppError::validation(FieldErrors::default()).code_str(), "validation_error");
        assert_eq!(AppError::validation(FieldErrors::default()).message(), "invalid fields");
        assert_eq!(AppError::conflict("dup").code_str(), "conflict");
        assert_eq!(AppError::invalid_credentials().code_str(), "invalid_credentials");
        assert_eq!(AppError::unauthorized().code_str(), "unauthorized");
        assert_eq!(AppError::user_not_found().code_str(), "user_not_found");
        assert_eq!(AppError::storage().code_str(), "storage_error");
    }

    #[test]
    fn body_omits_details_unless_validation() {
        let conflict = AppError::conflict("handle already registered");
        let body = ErrorBody { error: conflict.code_str(), message: conflict.message(), details: conflict.details() };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, serde_json::json!({"error": "conflict", "message": "handle already registered"}));

        let mut fe = FieldErrors::default();
        fe.push("secret", "must not be blank");
        let invalid = AppError::validation(fe);
        let body = ErrorBody { error: invalid.code_str(), message: invalid.message(), details: invalid.details() };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["details"]["secret"][0], "must not be blank");
    }
}
