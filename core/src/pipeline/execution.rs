// core/src/pipeline/execution.rs

use crate::context_data::ContextData;
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// For each step: evaluate `skip_if`, then the `before`, `on` and `after`
  /// handlers. The first error aborts the run, the first `Stop` halts it.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(Level::DEBUG, step_name = %step_name, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let before = self.before.get(step_name).filter(|v| !v.is_empty());
      let on = self.on.get(step_name).filter(|v| !v.is_empty());
      let after = self.after.get(step_name).filter(|v| !v.is_empty());

      if before.is_none() && on.is_none() && after.is_none() {
        if step_def.optional {
          event!(Level::DEBUG, step_name = %step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name = %step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", step_name = %step_name, step_index = step_idx);
      let outcome = async {
        for (phase, handlers) in [("before", before), ("on", on), ("after", after)] {
          if let Some(handlers) = handlers {
            if let Some(stopped) = Self::run_phase(phase, handlers, &ctx_data).await? {
              return Ok(Some(stopped));
            }
          }
        }
        Ok::<_, Err>(None)
      }
      .instrument(step_span)
      .await?;

      if let Some(stopped) = outcome {
        return Ok(stopped);
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(
    phase: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<Option<PipelineResult>, Err> {
    for handler_fn in handlers {
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, phase = phase, "Pipeline stopped by a handler.");
          return Ok(Some(PipelineResult::Stopped));
        }
        Err(e) => {
          event!(Level::WARN, phase = phase, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(None)
  }
}
