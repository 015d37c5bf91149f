// lemon_api/src/main.rs

use anyhow::{anyhow, Context};
use actix_web::middleware::NormalizePath;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use lemon_api::config::{AppConfig, LogFormat, StorageBackend};
use lemon_api::services::{auth_service, catalog_service};
use lemon_api::store::{MemoryStore, PgStore, Store};
use lemon_api::web::configure_app_routes;
use lemon_api::AppState;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
  match config.storage_backend {
    StorageBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres backend"))?;
      let store = PgStore::connect(url, config.database_max_connections)
        .await
        .context("Failed to connect to the database")?;
      if config.run_migrations {
        store.migrate().await.context("Failed to apply database migrations")?;
      }
      Ok(Arc::new(store))
    }
    StorageBackend::Memory => {
      tracing::warn!("Using in-memory storage; all data is lost on shutdown.");
      Ok(Arc::new(MemoryStore::new()))
    }
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;
  init_tracing(app_config.log_format);
  tracing::info!(backend = ?app_config.storage_backend, "Starting Little Lemon API server...");

  let store = build_store(&app_config).await?;

  if let Some(admin) = &app_config.admin {
    auth_service::bootstrap_admin(store.as_ref(), admin)
      .await
      .context("Failed to bootstrap the admin user")?;
  }
  if app_config.seed_db {
    catalog_service::seed_catalog(store.as_ref())
      .await
      .context("Failed to seed the catalog")?;
  }

  let server_address = app_config.bind_address();
  let app_state = AppState::new(store, app_config);
  tracing::info!("Pipelines registered.");

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(NormalizePath::trim())
      .wrap(TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
