// lemon_api/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::store::Store;
use lemon_flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the shared state and registers every workflow pipeline.
  pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      store,
      flows,
      config: Arc::new(config),
    }
  }
}
