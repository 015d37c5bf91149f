// lemon_api/src/pipelines/place_order_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::PlaceOrderCtxData;
use crate::policy::{self, Action, Resource};
use lemon_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument};

/// Registers cart → order conversion.
pub fn register_place_order_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("authorize_placement", false, None),
    ("convert_cart", false, None),
  ]);

  p.on_root("authorize_placement", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      policy::enforce(&guard.actor, Resource::Orders, Action::Create).map(|_| PipelineControl::Continue)
    })
  });

  p.on_root("convert_cart", convert_cart);

  p.after_root("convert_cart", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if let Some(placed) = guard.order.as_ref() {
        info!(
          order_id = placed.order.id,
          user_id = placed.order.user_id,
          total = %placed.order.total,
          item_count = placed.order_items.len(),
          "Order placed."
        );
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  tracing::info!("Place-order pipeline registered.");
}

#[instrument(name = "order::convert_cart", skip_all)]
async fn convert_cart(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let (user_id, placed_at, store) = {
    let guard = ctx_data.read();
    (guard.actor.user_id, guard.placed_at, guard.app_state.store.clone())
  };

  let placed = store.place_order(user_id, placed_at).await?;
  ctx_data.write().order = Some(placed);
  Ok(PipelineControl::Continue)
}
