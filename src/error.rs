use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
/// Batch error
///
/// Every variant except [`BatchError::Configuration`] ends a running step with
/// [`BatchStatus::Failed`](crate::core::step::BatchStatus::Failed) and is kept
/// as the failure cause of its [`StepExecution`](crate::core::step::StepExecution).
pub enum BatchError {
    /// The origin could not be opened, a record was malformed or a read failed.
    #[error("ItemReader from: {0}")]
    ItemReader(String),

    /// A processor rejected an item with an error (filtering is not an error).
    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    /// The destination could not be opened or a batch could not be committed.
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("Step cancelled before the end of input")]
    Cancelled,

    /// Invalid wiring detected while building a component.
    #[error("Configuration: {0}")]
    Configuration(String),
}
