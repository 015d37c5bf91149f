// core/src/lib.rs

//! lemon-flow: a small asynchronous step-pipeline engine.
//!
//! A workflow is declared as an ordered list of named steps. Each step can carry
//! `before`, `on` and `after` handlers that share one lockable context
//! (`ContextData<T>`). Handlers return a `PipelineControl` to keep going or to
//! halt, or an error that aborts the run.
//!
//! Pipelines are registered in a `FlowRegistry`, keyed by their context type, so
//! callers only need to build the context and ask the registry to run it.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context_data::ContextData;
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::{Handler, Pipeline};
pub use crate::registry::FlowRegistry;
pub use crate::step::{SkipCondition, StepDef};
