/// Processors shared by the jobs: filtering and logging.
pub mod processor;

#[cfg(feature = "csv")]
/// Delimited text `ItemReader` and `ItemWriter`.
pub mod delimited;

#[cfg(feature = "rdbc-sqlite")]
/// SQLite table `ItemReader` and `ItemWriter`.
pub mod rdbc;
