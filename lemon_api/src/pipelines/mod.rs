// lemon_api/src/pipelines/mod.rs

//! Multi-step workflows, each declared as a `lemon_flow::Pipeline` and run
//! through the registry held in `AppState`.

use crate::errors::AppError;
use lemon_flow::FlowRegistry;

pub mod contexts;

pub mod cart_pipeline;
pub mod place_order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;
pub mod update_order_pipeline;

/// Registers every pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &FlowRegistry<AppError>) {
  signup_pipeline::register_signup_pipeline(registry);
  signin_pipeline::register_signin_pipeline(registry);
  cart_pipeline::register_add_to_cart_pipeline(registry);
  place_order_pipeline::register_place_order_pipeline(registry);
  update_order_pipeline::register_update_order_pipeline(registry);
  tracing::debug!("All pipelines registered.");
}
