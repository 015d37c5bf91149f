// lemon_api/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use lemon_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
  pub username: String,
  #[serde(default)]
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub username: String,
  pub password: String,
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(username = %payload.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let RegisterPayload {
    username,
    email,
    password,
  } = payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    username,
    email: email.trim().to_string(),
    password,
    created_user: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let created = ctx_data
        .read()
        .created_user
        .clone()
        .ok_or_else(|| AppError::Internal("Signup completed without a user.".to_string()))?;
      Ok(HttpResponse::Created().json(created))
    }
    PipelineResult::Stopped => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::Internal("Registration was halted.".to_string()))
    }
  }
}

#[instrument(name = "handler::me", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({
    "username": auth_user.actor.username,
    "email": auth_user.actor.email,
  })))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(username = %payload.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let LoginPayload { username, password } = payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    username,
    password,
    user: None,
    auth_token: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let token = ctx_data
        .read()
        .auth_token
        .clone()
        .ok_or_else(|| AppError::Internal("Sign-in completed without a token.".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({ "auth_token": token })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Sign-in was halted.".to_string())),
  }
}

#[instrument(name = "handler::logout", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.delete_token(&auth_user.token).await?;
  info!("Auth token revoked.");
  Ok(HttpResponse::NoContent().finish())
}
