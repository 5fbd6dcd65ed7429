//! The two book jobs, each a single chunk-oriented step between a delimited
//! file and the `Book` table of a SQLite database.

use tokio_util::sync::CancellationToken;

use crate::{
    BatchError,
    core::{
        item::{ItemProcessor, PassThroughProcessor},
        listener::StepExecutionListener,
        step::{StepBuilder, StepExecution},
    },
};

/// Table-to-file export.
pub mod export;

/// File-to-table import.
pub mod import;

pub use export::{EXPORT_QUERY, EXPORT_STEP, run_export};
pub use import::{IMPORT_STEP, IMPORT_TABLE, run_import};

fn run_step<'a, I, O>(
    mut builder: StepBuilder<'a, I, O>,
    cancellation: Option<CancellationToken>,
    listeners: &[&'a dyn StepExecutionListener],
) -> Result<StepExecution, BatchError>
where
    PassThroughProcessor: ItemProcessor<I, O>,
{
    if let Some(token) = cancellation {
        builder = builder.cancellation_token(token);
    }

    for listener in listeners {
        builder = builder.listener(*listener);
    }

    Ok(builder.build()?.execute())
}
