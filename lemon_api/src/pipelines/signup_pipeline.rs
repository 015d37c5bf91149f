// lemon_api/src/pipelines/signup_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewUser, UserSummary};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::store::StoreError;
use lemon_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, instrument, warn, Level};

/// Registers the self-registration pipeline.
pub fn register_signup_pipeline(registry: &FlowRegistry<AppError>) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, email, password) = {
        let guard = ctx_data.read();
        (guard.username.clone(), guard.email.clone(), guard.password.clone())
      };

      event!(Level::DEBUG, username = %username, "Validating signup input.");
      auth_service::validate_username(&username)
        .and(auth_service::validate_email(&email))
        .and(auth_service::validate_password(&password))
        .map(|_| PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_user", check_existing_user);
  signup_p.on_root("create_user", create_user);

  registry.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}

#[instrument(name = "signup::check_existing_user", skip_all)]
async fn check_existing_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (username, store) = {
    let guard = ctx_data.read();
    (guard.username.clone(), guard.app_state.store.clone())
  };

  if store.find_user_by_username(&username).await?.is_some() {
    warn!(username = %username, "Signup attempted with a taken username.");
    return Err(AppError::Validation("A user with that username already exists.".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::create_user", skip_all)]
async fn create_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (username, email, password, store) = {
    let guard = ctx_data.read();
    (
      guard.username.clone(),
      guard.email.clone(),
      guard.password.clone(),
      guard.app_state.store.clone(),
    )
  };

  let password_hash = auth_service::hash_password(&password)?;
  let new_user = NewUser {
    username,
    email,
    password_hash,
    is_superuser: false,
  };

  // The unique index still guards against a concurrent signup for the same name.
  let user = store.create_user(new_user).await.map_err(|e| match e {
    StoreError::Duplicate(_) => AppError::Validation("A user with that username already exists.".to_string()),
    other => AppError::from(other),
  })?;

  info!(user_id = user.id, username = %user.username, "User registered.");
  ctx_data.write().created_user = Some(UserSummary::from(&user));
  Ok(PipelineControl::Continue)
}
