// lemon_api/src/web/extractors.rs

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::errors::AppError;
use crate::policy::Actor;
use crate::services::auth_service;
use crate::state::AppState;

const TOKEN_SCHEME: &str = "Token";

/// The caller of a request, resolved from `Authorization: Token <key>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub actor: Actor,
  pub token: String,
}

fn token_from_header(req: &HttpRequest) -> Result<String, AppError> {
  let raw = req
    .headers()
    .get(header::AUTHORIZATION)
    .ok_or_else(|| AppError::Unauthenticated("Authentication credentials were not provided.".to_string()))?;
  let value = raw
    .to_str()
    .map_err(|_| AppError::Unauthenticated("Invalid token header.".to_string()))?;

  match value.split_once(' ') {
    Some((scheme, key)) if scheme.eq_ignore_ascii_case(TOKEN_SCHEME) && !key.trim().is_empty() => {
      Ok(key.trim().to_string())
    }
    _ => Err(AppError::Unauthenticated("Invalid token header.".to_string())),
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = token_from_header(req);

    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let token = token.map_err(|e| {
        warn!(error = %e, "Rejected request without usable credentials.");
        e
      })?;
      let actor = auth_service::authenticate(state.store.as_ref(), &token).await?;
      Ok(AuthenticatedUser { actor, token })
    })
  }
}
