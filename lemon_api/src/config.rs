// lemon_api/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

/// Superuser created at startup when it does not exist yet.
#[derive(Clone)]
pub struct AdminBootstrap {
  pub username: String,
  pub email: String,
  pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AdminBootstrap")
      .field("username", &self.username)
      .field("email", &self.email)
      .field("password", &"[REDACTED]")
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage_backend: StorageBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub seed_db: bool,
  pub admin: Option<AdminBootstrap>,
  pub menu_max_page_size: u32,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      storage_backend: StorageBackend::Memory,
      database_url: None,
      database_max_connections: 10,
      run_migrations: true,
      seed_db: false,
      admin: None,
      menu_max_page_size: 100,
      log_format: LogFormat::Text,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let storage_backend: StorageBackend = get_or("STORAGE_BACKEND", "postgres").parse()?;
    let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
    if storage_backend == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required when STORAGE_BACKEND=postgres)".to_string(),
      ));
    }
    let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &get_or("DATABASE_MAX_CONNECTIONS", "10"))?;
    let run_migrations = parse_var("RUN_MIGRATIONS", &get_or("RUN_MIGRATIONS", "true"))?;
    let seed_db = parse_var("SEED_DB", &get_or("SEED_DB", "false"))?;

    let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
      (Some(username), Some(password)) => Some(AdminBootstrap {
        username,
        password,
        email: get_or("ADMIN_EMAIL", ""),
      }),
      (None, None) => None,
      _ => {
        return Err(AppError::Config(
          "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string(),
        ))
      }
    };

    let menu_max_page_size: u32 = parse_var("MENU_MAX_PAGE_SIZE", &get_or("MENU_MAX_PAGE_SIZE", "100"))?;
    if menu_max_page_size == 0 {
      return Err(AppError::Config("MENU_MAX_PAGE_SIZE must be at least 1".to_string()));
    }

    let log_format = match get_or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
      "text" => LogFormat::Text,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      storage_backend,
      database_url,
      database_max_connections,
      run_migrations,
      seed_db,
      admin,
      menu_max_page_size,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}
