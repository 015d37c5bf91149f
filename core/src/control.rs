// core/src/control.rs

//! Signals for controlling pipeline flow and the outcome of a run.

/// Returned by a handler to say whether the pipeline should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt immediately. No further handlers of this step or later steps run.
  Stop,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was skipped) without a handler asking to stop.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
