//! Delimited text support: one record per line, values separated by a
//! configurable single-byte delimiter.
//!
//! # Module Architecture
//!
//! 1. **DelimitedFileItemReader**: maps each line to a [`Record`](crate::core::record::Record)
//!    by position, after skipping a number of header lines.
//!
//! 2. **DelimitedFileItemWriter**: renders the selected fields of each record
//!    as one line and appends whole chunks at once.
//!
//! Both are configured through builders and resolve field names against the
//! record's field table when built, so a typo in a name fails before the first
//! line is read or written.
//!
//! # Examples
//!
//! ```
//! use book_batch::book::{BOOK_FILE_FIELDS, Book};
//! use book_batch::core::item::{ItemReader, ItemWriter};
//! use book_batch::item::delimited::{
//!     DelimitedFileItemReaderBuilder, DelimitedFileItemWriterBuilder,
//! };
//!
//! let data = "\
//! title;author;isbn;publisher;publishedOn
//! Dune;Frank Herbert;9780441013593;Ace;1965
//! ";
//!
//! let reader = DelimitedFileItemReaderBuilder::<Book>::new()
//!     .delimiter(b';')
//!     .names(&BOOK_FILE_FIELDS)
//!     .from_reader(data.as_bytes())?;
//!
//! let book = reader.read()?.expect("one book");
//! assert_eq!(book.published_year, 1965);
//!
//! let writer = DelimitedFileItemWriterBuilder::<Book>::new().from_writer(Vec::new())?;
//! writer.write(&[book])?;
//!
//! let output = String::from_utf8(writer.into_inner().expect("buffer")).expect("utf-8");
//! assert_eq!(output, "Dune,Frank Herbert,9780441013593,Ace,1965\n");
//! # Ok::<(), book_batch::BatchError>(())
//! ```

use std::io;

/// A module providing facilities for reading delimited records.
pub mod delimited_reader;

/// A module providing facilities for writing delimited records.
pub mod delimited_writer;

pub use delimited_reader::{DelimitedFileItemReader, DelimitedFileItemReaderBuilder};
pub use delimited_writer::{DelimitedFileItemWriter, DelimitedFileItemWriterBuilder};

/// Number of header lines skipped by default.
pub const DEFAULT_LINES_TO_SKIP: usize = 1;

/// Deferred acquisition of a file: description used in errors, and the
/// function opening it.
type Opener<S> = (String, Box<dyn FnOnce() -> io::Result<S>>);
