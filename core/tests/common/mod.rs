// core/tests/common/mod.rs
#![allow(dead_code)]

use lemon_flow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// A kitchen ticket moving through preparation stations.
#[derive(Clone, Debug, Default)]
pub struct TicketContext {
  pub dishes_prepared: i32,
  pub notes: String,
  pub stations_visited: Vec<String>,
  pub hold_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TicketError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Station failed: {0}")]
  Station(String),
}

impl From<FlowError> for TicketError {
  fn from(err: FlowError) -> Self {
    TicketError::Flow(format!("{:?}", err))
  }
}

/// Handler that records the station, bumps the dish count and appends a note.
/// Stops the pipeline when the ticket is held at this station.
pub fn station(name: &'static str, note: &'static str) -> Handler<TicketContext, TicketError> {
  Box::new(move |ctx: ContextData<TicketContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.dishes_prepared += 1;
      guard.notes.push_str(note);
      guard.stations_visited.push(name.to_string());
      if guard.hold_at.as_deref() == Some(name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_station(name: &'static str, reason: &'static str) -> Handler<TicketContext, TicketError> {
  Box::new(move |ctx: ContextData<TicketContext>| {
    Box::pin(async move {
      ctx.write().stations_visited.push(name.to_string());
      Err(TicketError::Station(reason.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
