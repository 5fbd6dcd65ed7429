#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # book-batch

 Chunk-oriented batch processing, and the two jobs built with it: importing a
 delimited file of books into a SQLite `Book` table, and exporting that table
 back to a delimited file.

 ## Core Concepts

- **ItemReader:** produces the input of a step one item at a time, `Ok(None)`
  marking the end of input.
- **ItemProcessor:** the business logic applied to each item. Returning
  `Ok(None)` filters the item out.
- **ItemWriter:** consumes the output of a step one chunk at a time, `write`
  then `flush` committing it.
- **Step:** reads, processes and buffers items until the chunk is full, then
  writes it, and reports the run as a `StepExecution`.

 ## Features

| **Feature**   | **Description**                                                  |
|---------------|------------------------------------------------------------------|
| csv           | Enables the delimited file `ItemReader` and `ItemWriter`         |
| rdbc-sqlite   | Enables the SQLite table `ItemReader` and `ItemWriter`, and the jobs |
| cli           | Builds the `book-batch` command line tool                        |

 ## Getting Started

```rust
# use book_batch::{
#     book::{published_year_filter, Book, BOOK_FILE_FIELDS},
#     core::step::{BatchStatus, StepBuilder},
#     item::delimited::{DelimitedFileItemReaderBuilder, DelimitedFileItemWriterBuilder},
#     BatchError,
# };
# fn main() -> Result<(), BatchError> {
let input = "\
title;author;isbn;publisher;publishedOn
Dune;Frank Herbert;9780441013593;Ace;1965
Klara and the Sun;Kazuo Ishiguro;9780593318171;Knopf;2021
Neuromancer;William Gibson;9780441569595;Ace;1984
";

let reader = DelimitedFileItemReaderBuilder::<Book>::new()
    .delimiter(b';')
    .names(&BOOK_FILE_FIELDS)
    .from_reader(input.as_bytes())?;

let processor = published_year_filter(2019);

let writer = DelimitedFileItemWriterBuilder::<Book>::new()
    .names(&["title", "publishedOn"])
    .from_writer(Vec::new())?;

let execution = {
    let step = StepBuilder::<Book, Book>::new()
        .name("books")
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(2)
        .build()?;

    step.execute()
};

assert_eq!(execution.status, BatchStatus::Completed);
assert_eq!(execution.read_count, 3);
assert_eq!(execution.filter_count, 1);
assert_eq!(execution.commit_count, 1);

let output = writer.into_inner().unwrap_or_default();
assert_eq!(String::from_utf8_lossy(&output), "Dune,1965\nNeuromancer,1984\n");
# Ok(())
# }
```

 ## Command line

 With the `cli` feature, `book-batch import --input-file books.csv` and
 `book-batch export --output-file books.csv` run the jobs against the database
 given by `--database-url` or `DATABASE_URL`.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

pub use error::*;

/// The book record and its business rule
pub mod book;

/// Run parameters
pub mod config;

/// Set of items readers / writers  (delimited files, SQLite tables) and processors
pub mod item;

#[cfg(all(feature = "csv", feature = "rdbc-sqlite"))]
/// Import and export jobs
pub mod jobs;
