// lemon_api/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use lemon_flow::FlowError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Required: {0}")]
  Unauthenticated(String),

  #[error("Permission Denied: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Message shown to API clients. Server-side failures are not described.
  pub fn client_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Unauthenticated(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
        m.clone()
      }
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "An internal error occurred.".to_string()
      }
    }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::Duplicate(m) | StoreError::InUse(m) | StoreError::MissingReference(m) => AppError::Validation(m),
      StoreError::EmptyCart => AppError::Validation("Your cart is empty. Add menu items before placing an order.".to_string()),
      StoreError::Database(e) => AppError::Sqlx(e),
    }
  }
}

/// Recovers the client error from a rejected extractor (see `web::routes` configs).
impl From<actix_web::Error> for AppError {
  fn from(err: actix_web::Error) -> Self {
    let message = match err.as_error::<AppError>() {
      Some(app_err) => app_err.client_message(),
      None => err.to_string(),
    };
    match err.as_response_error().status_code() {
      StatusCode::NOT_FOUND => AppError::NotFound(message),
      StatusCode::UNAUTHORIZED => AppError::Unauthenticated(message),
      status if status.is_client_error() => AppError::Validation(message),
      _ => AppError::Internal(message),
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with server error");
    } else {
      tracing::debug!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }
    HttpResponse::build(status).json(json!({ "message": self.client_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
