// lemon_api/src/pipelines/update_order_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::Role;
use crate::pipelines::contexts::UpdateOrderCtxData;
use crate::policy::{self, Action, Resource, NOT_FOUND_MESSAGE};
use lemon_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Registers the partial order update (status and crew assignment).
pub fn register_update_order_pipeline(registry: &FlowRegistry<AppError>) {
  let no_crew_assignment: SkipCondition<UpdateOrderCtxData> =
    Arc::new(|ctx_data: ContextData<UpdateOrderCtxData>| !matches!(ctx_data.read().changes.delivery_crew_id, Some(Some(_))));

  let mut p = Pipeline::<UpdateOrderCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_changes", false, None),
    ("validate_delivery_crew", false, Some(no_crew_assignment)),
    ("apply_changes", false, None),
  ]);

  p.on_root("load_order", load_order);
  p.on_root("authorize_changes", |ctx_data: ContextData<UpdateOrderCtxData>| {
    Box::pin(async move { authorize_changes(&ctx_data.read()) })
  });
  p.on_root("validate_delivery_crew", validate_delivery_crew);
  p.on_root("apply_changes", apply_changes);

  registry.register_pipeline(p);
  tracing::info!("Update-order pipeline registered.");
}

#[instrument(name = "order::load_order", skip_all)]
async fn load_order(ctx_data: ContextData<UpdateOrderCtxData>) -> AppResult<PipelineControl> {
  let (order_id, store) = {
    let guard = ctx_data.read();
    (guard.order_id, guard.app_state.store.clone())
  };

  let current = store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
  ctx_data.write().current = Some(current);
  Ok(PipelineControl::Continue)
}

fn authorize_changes(ctx: &UpdateOrderCtxData) -> AppResult<PipelineControl> {
  let current = ctx
    .current
    .as_ref()
    .ok_or_else(|| AppError::Internal("Order missing from update context.".to_string()))?;

  if ctx.changes.is_empty() {
    return Err(AppError::Validation(
      "Provide at least one of 'status' or 'delivery_crew'.".to_string(),
    ));
  }
  if ctx.changes.delivery_crew_id.is_some() {
    policy::enforce(&ctx.actor, Resource::Order(&current.order), Action::AssignCrew)?;
  }
  if ctx.changes.status.is_some() {
    policy::enforce(&ctx.actor, Resource::Order(&current.order), Action::SetStatus)?;
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order::validate_delivery_crew", skip_all)]
async fn validate_delivery_crew(ctx_data: ContextData<UpdateOrderCtxData>) -> AppResult<PipelineControl> {
  let (crew_id, store) = {
    let guard = ctx_data.read();
    (guard.changes.delivery_crew_id.flatten(), guard.app_state.store.clone())
  };
  let Some(crew_id) = crew_id else {
    return Ok(PipelineControl::Continue);
  };

  let is_crew = match store.find_user(crew_id).await? {
    Some(user) => store.user_roles(user.id).await?.contains(Role::DeliveryCrew),
    None => false,
  };
  if !is_crew {
    warn!(crew_id, "Rejected delivery crew assignment.");
    return Err(AppError::Validation(format!(
      "User {} is not a member of the Delivery crew group.",
      crew_id
    )));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order::apply_changes", skip_all)]
async fn apply_changes(ctx_data: ContextData<UpdateOrderCtxData>) -> AppResult<PipelineControl> {
  let (order_id, changes, user_id, store) = {
    let guard = ctx_data.read();
    (
      guard.order_id,
      guard.changes.clone(),
      guard.actor.user_id,
      guard.app_state.store.clone(),
    )
  };

  let updated = store
    .update_order(order_id, &changes)
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
  info!(
    order_id,
    updated_by = user_id,
    status = updated.order.status,
    delivery_crew = ?updated.order.delivery_crew_id,
    "Order updated."
  );
  ctx_data.write().updated = Some(updated);
  Ok(PipelineControl::Continue)
}
