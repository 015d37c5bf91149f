// lemon_api/src/pipelines/signin_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use lemon_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument, warn};

pub const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Registers the token sign-in pipeline.
pub fn register_signin_pipeline(registry: &FlowRegistry<AppError>) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("find_user", false, None),
    ("verify_credentials", false, None),
    ("issue_token", false, None),
  ]);

  signin_p.on_root("find_user", find_user);

  signin_p.on_root("verify_credentials", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let Some(user) = guard.user.as_ref() else {
        return Err(AppError::Validation(BAD_CREDENTIALS.to_string()));
      };
      match auth_service::verify_password(&user.password_hash, &guard.password) {
        Ok(true) => Ok(PipelineControl::Continue),
        Ok(false) => {
          warn!(user_id = user.id, "Password mismatch on sign-in.");
          Err(AppError::Validation(BAD_CREDENTIALS.to_string()))
        }
        Err(e) => Err(e),
      }
    })
  });

  signin_p.on_root("issue_token", issue_token);

  registry.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}

#[instrument(name = "signin::find_user", skip_all)]
async fn find_user(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (username, store) = {
    let guard = ctx_data.read();
    (guard.username.clone(), guard.app_state.store.clone())
  };

  match store.find_user_by_username(&username).await? {
    Some(user) => {
      ctx_data.write().user = Some(user);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(username = %username, "Sign-in for unknown username.");
      Err(AppError::Validation(BAD_CREDENTIALS.to_string()))
    }
  }
}

#[instrument(name = "signin::issue_token", skip_all)]
async fn issue_token(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (user_id, store) = {
    let guard = ctx_data.read();
    let user_id = guard
      .user
      .as_ref()
      .map(|u| u.id)
      .ok_or_else(|| AppError::Internal("Sign-in reached token issue without a user.".to_string()))?;
    (user_id, guard.app_state.store.clone())
  };

  let token = auth_service::generate_token();
  store.create_token(user_id, &token).await?;
  info!(user_id, "Auth token issued.");
  ctx_data.write().auth_token = Some(token);
  Ok(PipelineControl::Continue)
}
