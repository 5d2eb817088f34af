use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::auth_service::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    External(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0}")]
    File(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Replaces the message of a uniqueness conflict, leaves other errors as they are.
    pub fn on_conflict(self, message: &str) -> Self {
        match self {
            AppError::Conflict(_) => AppError::Conflict(message.to_string()),
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation { .. } | AppError::File(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::External(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Resource already exists".to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' validation", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        AppError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match &self {
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg.clone()),
            AppError::Validation { message, .. } => ("VALIDATION_ERROR", message.clone()),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone()),
            AppError::External(msg) => {
                tracing::warn!("External service error: {}", msg);
                ("EXTERNAL_ERROR", msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("DATABASE_ERROR", "Internal server error".to_string())
            }
            AppError::Token(e) => ("INVALID_TOKEN", e.to_string()),
            AppError::File(msg) => ("FILE_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let body = match self {
            AppError::Validation { fields, .. } => json!({
                "success": false,
                "message": message,
                "error": error_code,
                "data": fields,
            }),
            _ => json!({
                "success": false,
                "message": message,
                "error": error_code,
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
