use sqlx::{Pool, Sqlite};
use tokio_util::sync::CancellationToken;

use crate::{
    BatchError,
    book::{BOOK_TABLE_COLUMNS, Book},
    config::JobParameters,
    core::{
        listener::StepExecutionListener,
        step::{StepBuilder, StepExecution},
    },
    item::{
        delimited::DelimitedFileItemWriterBuilder, processor::LoggingProcessor,
        rdbc::TableItemReaderBuilder,
    },
};

use super::run_step;

pub const EXPORT_STEP: &str = "export-step";

pub const EXPORT_QUERY: &str =
    "SELECT title, author, isbn, publisher, year FROM Book ORDER BY rowid";

/// Writes every row of the `Book` table to `output_path`, one line per book,
/// without header. Rows are fetched one chunk at a time and logged as they
/// are processed.
///
/// Must be called from a multi-thread Tokio runtime.
///
/// # Errors
/// `BatchError::Configuration` when the parameters are invalid. Failures of
/// the run itself are reported by the returned [`StepExecution`].
pub fn run_export(
    pool: &Pool<Sqlite>,
    parameters: &JobParameters,
    cancellation: Option<CancellationToken>,
    listeners: &[&dyn StepExecutionListener],
) -> Result<StepExecution, BatchError> {
    parameters.validate()?;
    let output = parameters.require_output()?;

    let reader = TableItemReaderBuilder::<Book>::new()
        .pool(pool)
        .query(EXPORT_QUERY)
        .columns(&BOOK_TABLE_COLUMNS)
        .page_size(parameters.chunk_size)
        .build()?;

    let processor = LoggingProcessor;

    let writer = DelimitedFileItemWriterBuilder::<Book>::new()
        .delimiter(parameters.delimiter.unwrap_or(b','))
        .from_path(output)?;

    let builder = StepBuilder::<Book, Book>::new()
        .name(EXPORT_STEP)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(parameters.chunk_size);

    run_step(builder, cancellation, listeners)
}
