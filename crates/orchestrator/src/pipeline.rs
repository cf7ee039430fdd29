//! Sequential analysis pipeline with live progress events.
//!
//! A run publishes, in order:
//! `start`, then `step_start` followed by `step_complete` or `step_error` for
//! every analyzer, then `final_analysis_start`, `final_result` and `complete`.
//! A failure outside the analyzers ends the run with a single `error` event.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use events::{FinalResultData, ProgressChannel, ProgressEvent, ProgressPublisher};
use forensics_core::{AggregatedContext, TaskInput};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregate::{FinalAggregator, FinalAnswer};
use crate::analyzer::Analyzer;
use crate::error::{OrchestratorError, Result};

/// Handle to a run executing on its own task
pub struct RunHandle {
    pub run_id: Uuid,
    pub handle: JoinHandle<Result<AggregatedContext>>,
}

pub struct Pipeline {
    analyzers: Vec<Arc<dyn Analyzer>>,
    aggregator: FinalAggregator,
}

impl Pipeline {
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>, aggregator: FinalAggregator) -> Self {
        Self {
            analyzers,
            aggregator,
        }
    }

    pub fn analyzers(&self) -> &[Arc<dyn Analyzer>] {
        &self.analyzers
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Reset the channel and run the pipeline on a dedicated task.
    pub async fn start(
        self: &Arc<Self>,
        channel: &ProgressChannel,
        image_ref: impl Into<String>,
        text: Option<String>,
    ) -> RunHandle {
        let publisher = channel.begin_run().await;
        let run_id = publisher.run_id();
        let pipeline = Arc::clone(self);
        let image_ref = image_ref.into();

        let handle = tokio::spawn(async move { pipeline.run(&image_ref, text, &publisher).await });

        RunHandle { run_id, handle }
    }

    /// Execute one run, publishing every transition to `publisher`.
    pub async fn run(
        &self,
        image_ref: &str,
        text: Option<String>,
        publisher: &ProgressPublisher,
    ) -> Result<AggregatedContext> {
        let run_id = publisher.run_id();

        let task_input = match TaskInput::new(image_ref, text) {
            Ok(input) => input,
            Err(e) => {
                let err = OrchestratorError::from(e);
                error!(run_id = %run_id, error = %err, "Pipeline failed before start");
                publisher.publish(ProgressEvent::error(err.to_string()));
                return Err(err);
            }
        };

        match self.execute(task_input, publisher).await {
            Ok(context) => {
                publisher.publish(ProgressEvent::complete());
                info!(run_id = %run_id, results = context.len(), "Pipeline completed");
                Ok(context)
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Pipeline failed");
                publisher.publish(ProgressEvent::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        task_input: TaskInput,
        publisher: &ProgressPublisher,
    ) -> Result<AggregatedContext> {
        let total_steps = self.analyzers.len();
        let mut context = AggregatedContext::new(task_input);

        info!(
            run_id = %publisher.run_id(),
            image = %context.task_input.image_ref,
            total_steps,
            "Pipeline started"
        );
        publisher.publish(ProgressEvent::start(total_steps));

        for (index, analyzer) in self.analyzers.iter().enumerate() {
            let step = analyzer.name().to_string();
            let display_name = analyzer.display_name().to_string();

            publisher.publish(ProgressEvent::StepStart {
                step: step.clone(),
                display_name: display_name.clone(),
                step_number: index + 1,
                total_steps,
            });

            let outcome = AssertUnwindSafe(analyzer.analyze(&context.task_input))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(OrchestratorError::analyzer_failed(
                        step.as_str(),
                        format!("panicked: {}", panic_message(panic.as_ref())),
                    ))
                });

            match outcome {
                Ok(result) => {
                    info!(step = %step, "Step complete");
                    context.push(result.clone());
                    publisher.publish(ProgressEvent::StepComplete {
                        step,
                        display_name,
                        result,
                    });
                }
                Err(e) => {
                    warn!(step = %step, error = %e, "Step failed, continuing");
                    publisher.publish(ProgressEvent::StepError {
                        step,
                        display_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        publisher.publish(ProgressEvent::final_analysis_start());
        let response = self.aggregator.aggregate(&context).await?;
        let answer = FinalAnswer::from_response(&response);

        info!(
            probability_score = ?answer.probability_score,
            raw_output = answer.raw_output,
            "Final analysis done"
        );
        publisher.publish(ProgressEvent::FinalResult(FinalResultData {
            probability_score: answer.probability_score,
            explanation: answer.explanation,
            raw_output: answer.raw_output,
            full_context: context.clone(),
        }));

        Ok(context)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
