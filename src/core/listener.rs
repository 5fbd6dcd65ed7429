use log::{error, info};

use super::step::{BatchStatus, StepExecution};

/// Observer of a step's lifecycle.
///
/// `after_step` is called exactly once per execution, when the step has
/// reached a terminal status and released its reader and writer.
pub trait StepExecutionListener {
    fn before_step(&self, _execution: &StepExecution) {}

    fn after_step(&self, execution: &StepExecution);
}

/// Logs a completion report for every finished step.
#[derive(Default, Debug, Clone, Copy)]
pub struct LoggingStepListener;

impl StepExecutionListener for LoggingStepListener {
    fn before_step(&self, execution: &StepExecution) {
        info!("Step {} starting, id: {}", execution.name, execution.id);
    }

    fn after_step(&self, execution: &StepExecution) {
        match execution.status {
            BatchStatus::Completed => info!(
                "Step {} completed in {:?}: {} read, {} filtered, {} written in {} chunks",
                execution.name,
                execution.duration,
                execution.read_count,
                execution.filter_count,
                execution.write_count,
                execution.commit_count
            ),
            _ => error!(
                "Step {} ended with status {:?} after {:?}: {} read, {} filtered, {} written, cause: {}",
                execution.name,
                execution.status,
                execution.duration,
                execution.read_count,
                execution.filter_count,
                execution.write_count,
                execution
                    .failure
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), |cause| cause.to_string())
            ),
        }
    }
}
