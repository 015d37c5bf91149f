// lemon_api/src/services/auth_service.rs

//! Password hashing, token issuing and the checks behind registration.

use crate::config::AdminBootstrap;
use crate::errors::{AppError, Result as AppResult};
use crate::models::NewUser;
use crate::policy::Actor;
use crate::store::Store;
use argon2::{
  password_hash::{rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use rand_core::{OsRng, RngCore};
use std::fmt::Write as _;
use tracing::{debug, error, info, instrument, warn};

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;
const TOKEN_BYTES: usize = 20;

/// Hashes a plain-text password with Argon2 and a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> AppResult<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut SaltRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing failed: {}", argon_err)))
    }
  }
}

/// Checks `provided_password` against a stored Argon2 hash.
///
/// A mismatch is `Ok(false)`; only an unreadable stored hash is an error.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> AppResult<bool> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash.");
    AppError::Internal(format!("Invalid stored password hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification failed.");
      Err(AppError::Internal(format!("Password verification failed: {}", other)))
    }
  }
}

/// A fresh 40-character hex token key.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  let mut key = String::with_capacity(TOKEN_BYTES * 2);
  for byte in bytes {
    let _ = write!(key, "{:02x}", byte);
  }
  key
}

/// Resolves a token key into the acting user and their roles.
#[instrument(name = "auth_service::authenticate", skip_all)]
pub async fn authenticate(store: &dyn Store, token: &str) -> AppResult<Actor> {
  let user = store
    .find_user_by_token(token)
    .await?
    .ok_or_else(|| AppError::Unauthenticated("Invalid token.".to_string()))?;
  let roles = store.user_roles(user.id).await?;
  Ok(Actor::new(&user, roles))
}

pub fn validate_username(username: &str) -> AppResult<()> {
  if username.is_empty() || username.chars().count() > USERNAME_MAX_LEN {
    return Err(AppError::Validation(format!(
      "Username must be between 1 and {} characters.",
      USERNAME_MAX_LEN
    )));
  }
  if !username
    .chars()
    .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
  {
    return Err(AppError::Validation(
      "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.".to_string(),
    ));
  }
  Ok(())
}

/// Empty is allowed; anything else needs an `@` with text on both sides.
pub fn validate_email(email: &str) -> AppResult<()> {
  if email.is_empty() {
    return Ok(());
  }
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) => Ok(()),
    _ => Err(AppError::Validation("Enter a valid email address.".to_string())),
  }
}

pub fn validate_password(password: &str) -> AppResult<()> {
  if password.chars().count() < PASSWORD_MIN_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      PASSWORD_MIN_LEN
    )));
  }
  Ok(())
}

/// Creates the configured superuser unless a user with that name exists.
#[instrument(name = "auth_service::bootstrap_admin", skip_all, fields(username = %admin.username))]
pub async fn bootstrap_admin(store: &dyn Store, admin: &AdminBootstrap) -> AppResult<()> {
  if store.find_user_by_username(&admin.username).await?.is_some() {
    info!("Admin user already present.");
    return Ok(());
  }
  validate_username(&admin.username)?;
  validate_email(&admin.email)?;
  if validate_password(&admin.password).is_err() {
    warn!("Configured admin password is shorter than the registration minimum.");
  }

  let user = store
    .create_user(NewUser {
      username: admin.username.clone(),
      email: admin.email.clone(),
      password_hash: hash_password(&admin.password)?,
      is_superuser: true,
    })
    .await?;
  info!(user_id = user.id, "Admin user created.");
  Ok(())
}
