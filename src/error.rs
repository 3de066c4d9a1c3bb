use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Stable descriptor rendered in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub name: &'static str,
    pub status: StatusCode,
    pub message: &'static str,
}

impl ErrorCode {
    pub const VALIDATION_ERROR: Self = Self::new(
        "VALIDATION_ERROR",
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid request data",
    );
    pub const INVALID_CREDENTIALS: Self = Self::new(
        "INVALID_CREDENTIALS",
        StatusCode::UNAUTHORIZED,
        "Invalid email or password",
    );
    pub const UNAUTHORIZED: Self = Self::new(
        "UNAUTHORIZED",
        StatusCode::UNAUTHORIZED,
        "Authentication required",
    );
    pub const CSRF_TOKEN_INVALID: Self = Self::new(
        "CSRF_TOKEN_INVALID",
        StatusCode::FORBIDDEN,
        "CSRF token missing or invalid",
    );
    pub const NOT_FOUND: Self = Self::new(
        "NOT_FOUND",
        StatusCode::NOT_FOUND,
        "Resource not found",
    );
    pub const EMAIL_ALREADY_EXISTS: Self = Self::new(
        "EMAIL_ALREADY_EXISTS",
        StatusCode::CONFLICT,
        "Email is already registered",
    );
    pub const HANDLE_ALREADY_EXISTS: Self = Self::new(
        "HANDLE_ALREADY_EXISTS",
        StatusCode::CONFLICT,
        "Handle is already taken",
    );
    pub const INVALID_RESET_CODE: Self = Self::new(
        "INVALID_RESET_CODE",
        StatusCode::BAD_REQUEST,
        "Reset code is invalid or expired",
    );
    pub const MOVIE_CREATION_FAILED: Self = Self::new(
        "MOVIE_CREATION_FAILED",
        StatusCode::BAD_GATEWAY,
        "Movie could not be created",
    );
    pub const NOT_IMPLEMENTED: Self = Self::new(
        "NOT_IMPLEMENTED",
        StatusCode::NOT_IMPLEMENTED,
        "Not implemented yet",
    );
    pub const INTERNAL_ERROR: Self = Self::new(
        "INTERNAL_ERROR",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    );

    const fn new(name: &'static str, status: StatusCode, message: &'static str) -> Self {
        Self { name, status, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("csrf token invalid")]
    CsrfInvalid,

    #[error("not found")]
    NotFound,

    #[error("email already exists")]
    EmailTaken,

    #[error("handle already exists")]
    HandleTaken,

    #[error("invalid reset code")]
    InvalidResetCode,

    #[error("movie creation failed: {0}")]
    MovieCreation(anyhow::Error),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::VALIDATION_ERROR,
            AppError::InvalidCredentials => ErrorCode::INVALID_CREDENTIALS,
            AppError::Unauthorized => ErrorCode::UNAUTHORIZED,
            AppError::CsrfInvalid => ErrorCode::CSRF_TOKEN_INVALID,
            AppError::NotFound => ErrorCode::NOT_FOUND,
            AppError::EmailTaken => ErrorCode::EMAIL_ALREADY_EXISTS,
            AppError::HandleTaken => ErrorCode::HANDLE_ALREADY_EXISTS,
            AppError::InvalidResetCode => ErrorCode::INVALID_RESET_CODE,
            AppError::MovieCreation(_) => ErrorCode::MOVIE_CREATION_FAILED,
            AppError::NotImplemented(_) => ErrorCode::NOT_IMPLEMENTED,
            AppError::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid("path", rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_code_name: &'static str,
    pub error_code: u16,
    pub error_message: &'static str,
    pub error_description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (description, errors) = match self {
            AppError::Validation(fields) => {
                let description = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.field, f.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                (description, fields)
            }
            AppError::MovieCreation(e) => {
                error!(error = %e, "movie creation failed");
                ("The movie catalog could not provide this movie".to_string(), Vec::new())
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                (code.message.to_string(), Vec::new())
            }
            AppError::NotImplemented(what) => {
                (format!("{what} is not implemented yet"), Vec::new())
            }
            _ => (code.message.to_string(), Vec::new()),
        };

        let body = ErrorBody {
            error_code_name: code.name,
            error_code: code.status.as_u16(),
            error_message: code.message,
            error_description: description,
            errors,
        };
        (code.status, Json(body)).into_response()
    }
}
