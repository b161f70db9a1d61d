use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Constraint names declared in `migrations/`.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const TODOS_DESCRIPTION_KEY: &str = "to_dos_description_key";

/// One rejected field of a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every failure a request can end in.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("invalid filter `{param}`: {reason}")]
    InvalidFilter { param: String, reason: String },

    #[error("invalid pagination `{param}`: {reason}")]
    InvalidPagination { param: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("User password does not match")]
    Authentication,

    #[error(transparent)]
    Store(sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_filter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::InvalidFilter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Conflict raised by the named uniqueness constraint.
    pub fn conflict(constraint: Option<&str>) -> Self {
        let message = match constraint {
            Some(USERS_EMAIL_KEY) => "email already registered",
            Some(TODOS_DESCRIPTION_KEY) => "description already in use",
            _ => "resource already exists",
        };
        AppError::Conflict(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidFilter { .. }
            | AppError::InvalidPagination { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return AppError::conflict(db.constraint());
            }
            // the only foreign key in the schema is to_dos.user_id
            if db.is_foreign_key_violation() {
                return AppError::NotFound("user");
            }
        }
        AppError::Store(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Store(e) => {
                error!(error = %e, "store error");
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.into(),
                    details: None,
                }
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.into(),
                    details: None,
                }
            }
            AppError::Validation(fields) => {
                debug!(?fields, "payload rejected");
                ErrorBody {
                    error: self.to_string(),
                    details: Some(fields.as_slice()),
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
