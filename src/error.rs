use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Access denied: No token provided")]
    Unauthorized,

    #[error("Invalid or expired token")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(String),

    #[error("No availability for date {0}")]
    NoAvailability(NaiveDate),

    #[error("Not enough seats in slot {slot} on {date} (Available: {available})")]
    InsufficientSeats {
        slot: String,
        date: NaiveDate,
        available: i64,
    },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoAvailability(_)
            | AppError::InsufficientSeats { .. }
            | AppError::InvalidState(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Hash(_)
            | AppError::Token(_)
            | AppError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
