use std::future::Future;

use tokio::runtime::{Handle, RuntimeFlavor};

/// This module contains the SQLite table reader implementation.
pub mod table_reader;

/// This module contains the SQLite table writer implementation.
pub mod table_writer;

pub use table_reader::{TableItemReader, TableItemReaderBuilder};
pub use table_writer::{TableItemWriter, TableItemWriterBuilder};

/// Maximum number of bound parameters in one SQLite statement.
const BIND_LIMIT: usize = 32766;

/// Runs a database future to completion from synchronous step code.
///
/// The current thread must belong to a multi-thread Tokio runtime: blocking
/// on a current-thread runtime would stall its only worker.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let handle = Handle::try_current().map_err(|error| error.to_string())?;

    if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
        return Err(format!(
            "a multi-thread Tokio runtime is required, found {:?}",
            handle.runtime_flavor()
        ));
    }

    Ok(tokio::task::block_in_place(|| handle.block_on(future)))
}
