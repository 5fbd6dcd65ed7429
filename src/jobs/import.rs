use sqlx::{Pool, Sqlite};
use tokio_util::sync::CancellationToken;

use crate::{
    BatchError,
    book::{BOOK_FILE_FIELDS, BOOK_TABLE_COLUMNS, Book, published_year_filter},
    config::JobParameters,
    core::{
        listener::StepExecutionListener,
        step::{StepBuilder, StepExecution},
    },
    item::{delimited::DelimitedFileItemReaderBuilder, rdbc::TableItemWriterBuilder},
};

use super::run_step;

pub const IMPORT_STEP: &str = "import-step";

pub const IMPORT_TABLE: &str = "Book";

/// Loads the books of `input_path` into the `Book` table, skipping those
/// published after `max_published_year`.
///
/// Each chunk is inserted in its own transaction: when the run fails, the
/// chunks committed before the failure stay in the table.
///
/// Must be called from a multi-thread Tokio runtime.
pub fn run_import(
    pool: &Pool<Sqlite>,
    parameters: &JobParameters,
    cancellation: Option<CancellationToken>,
    listeners: &[&dyn StepExecutionListener],
) -> Result<StepExecution, BatchError> {
    parameters.validate()?;
    let input = parameters.require_input()?;

    let reader = DelimitedFileItemReaderBuilder::<Book>::new()
        .delimiter(parameters.delimiter.unwrap_or(b';'))
        .lines_to_skip(parameters.lines_to_skip)
        .names(&BOOK_FILE_FIELDS)
        .from_path(input)?;

    let processor = published_year_filter(parameters.max_published_year);

    let writer = TableItemWriterBuilder::<Book>::new()
        .pool(pool)
        .table(IMPORT_TABLE)
        .columns(&BOOK_TABLE_COLUMNS)
        .build()?;

    let builder = StepBuilder::<Book, Book>::new()
        .name(IMPORT_STEP)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(parameters.chunk_size);

    run_step(builder, cancellation, listeners)
}
