//! Run parameters of the import and export jobs.

use std::path::PathBuf;

use crate::{BatchError, book::DEFAULT_MAX_PUBLISHED_YEAR, core::step::DEFAULT_CHUNK_SIZE};

/// Parameters of one job run.
///
/// `delimiter` is left unset to use the job's own default: `;` when importing,
/// `,` when exporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParameters {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub delimiter: Option<u8>,
    pub lines_to_skip: usize,
    pub max_published_year: i32,
}

impl Default for JobParameters {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: None,
            lines_to_skip: 1,
            max_published_year: DEFAULT_MAX_PUBLISHED_YEAR,
        }
    }
}

impl JobParameters {
    /// Checks values that every job relies on.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }

        match self.delimiter {
            Some(b'"') | Some(b'\n') | Some(b'\r') => Err(BatchError::Configuration(
                "delimiter cannot be a quote or a line break".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn require_input(&self) -> Result<&PathBuf, BatchError> {
        self.input_path
            .as_ref()
            .ok_or_else(|| BatchError::Configuration("an input file is required".to_string()))
    }

    pub(crate) fn require_output(&self) -> Result<&PathBuf, BatchError> {
        self.output_path
            .as_ref()
            .ok_or_else(|| BatchError::Configuration("an output file is required".to_string()))
    }
}

/// Parses a delimiter given on the command line: a single ASCII character,
/// or `\t` for a tab.
pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match value.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!(
                "delimiter must be a single ASCII character, got '{}'",
                value
            )),
        },
    }
}
