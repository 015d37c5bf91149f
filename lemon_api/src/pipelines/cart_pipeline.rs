// lemon_api/src/pipelines/cart_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::money::MAX_QUANTITY;
use crate::models::NewCartItem;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::policy::{self, Action, Resource};
use crate::store::StoreError;
use lemon_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument, warn};

pub fn register_add_to_cart_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_menu_item", false, None),
    ("insert_cart_item", false, None),
  ]);

  p.on_root("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let owner_id = guard.actor.user_id;
      if let Err(denied) = policy::enforce(&guard.actor, Resource::Cart { owner_id }, Action::Create) {
        return Err(denied);
      }

      if !(1..=MAX_QUANTITY).contains(&guard.quantity) {
        warn!(quantity = guard.quantity, "Rejected cart quantity.");
        return Err(AppError::Validation(format!(
          "Quantity must be between 1 and {}.",
          MAX_QUANTITY
        )));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_menu_item", fetch_menu_item);
  p.on_root("insert_cart_item", insert_cart_item);

  registry.register_pipeline(p);
  tracing::info!("Add-to-cart pipeline registered.");
}

#[instrument(name = "cart::fetch_menu_item", skip_all)]
async fn fetch_menu_item(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (menuitem_id, store) = {
    let guard = ctx_data.read();
    (guard.menuitem_id, guard.app_state.store.clone())
  };

  match store.find_menu_item(menuitem_id).await? {
    Some(menu_item) => {
      ctx_data.write().menu_item = Some(menu_item);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(menuitem_id, "Cart add for unknown menu item.");
      Err(AppError::Validation(format!(
        "Invalid pk \"{}\" - object does not exist.",
        menuitem_id
      )))
    }
  }
}

#[instrument(name = "cart::insert_cart_item", skip_all)]
async fn insert_cart_item(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (line, title, store) = {
    let guard = ctx_data.read();
    let menu_item = guard
      .menu_item
      .as_ref()
      .ok_or_else(|| AppError::Internal("Menu item missing from cart context.".to_string()))?;
    (
      NewCartItem::snapshot(guard.actor.user_id, menu_item, guard.quantity),
      menu_item.title.clone(),
      guard.app_state.store.clone(),
    )
  };

  let cart_item = store.add_cart_item(line).await.map_err(|e| match e {
    StoreError::Duplicate(_) => AppError::Validation(format!(
      "No duplicates allowed. You already have {} in your cart, increase quantity instead.",
      title
    )),
    other => AppError::from(other),
  })?;

  info!(
    user_id = cart_item.user_id,
    menuitem_id = cart_item.menuitem_id,
    quantity = cart_item.quantity,
    price = %cart_item.price,
    "Menu item added to cart."
  );
  ctx_data.write().cart_item = Some(cart_item);
  Ok(PipelineControl::Continue)
}
