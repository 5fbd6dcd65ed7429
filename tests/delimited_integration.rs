#![cfg(feature = "csv")]

mod common;

use std::{
    fs,
    io::{self, ErrorKind},
};

use book_batch::{
    BatchError,
    book::{BOOK_FILE_FIELDS, Book},
    core::step::{BatchStatus, StepBuilder},
    item::delimited::{DelimitedFileItemReaderBuilder, DelimitedFileItemWriterBuilder},
};
use common::{InMemoryReader, MockFile, RecordingWriter, book};
use tempfile::tempdir;

#[test]
fn books_written_to_a_file_are_read_back_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("books.csv");

    let books = vec![
        book("The Dispossessed", 1974),
        book("The Lathe of Heaven; a novel", 1971),
        book("\"Tehanu\"", 1990),
    ];

    let reader = InMemoryReader::new(books.clone());
    let writer = DelimitedFileItemWriterBuilder::<Book>::new()
        .delimiter(b';')
        .names(&BOOK_FILE_FIELDS)
        .from_path(&path)
        .unwrap();

    let export = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .chunk(2)
        .build()
        .unwrap();

    assert_eq!(export.execute().status, BatchStatus::Completed);

    let reader = DelimitedFileItemReaderBuilder::<Book>::new()
        .delimiter(b';')
        .lines_to_skip(0)
        .names(&BOOK_FILE_FIELDS)
        .from_path(&path)
        .unwrap();
    let writer = RecordingWriter::default();

    let import = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let execution = import.execute();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(writer.batches.borrow().concat(), books);
}

#[test]
fn malformed_line_fails_the_step_and_releases_the_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("books.csv");
    let output = dir.path().join("export.csv");

    fs::write(
        &input,
        "title;author;isbn;publisher;publishedOn
Lavinia;Ursula K. Le Guin;9780151014248;Harcourt;2008
Malafrena;Ursula K. Le Guin;1979
",
    )
    .unwrap();

    let reader = DelimitedFileItemReaderBuilder::<Book>::new()
        .delimiter(b';')
        .names(&BOOK_FILE_FIELDS)
        .from_path(&input)
        .unwrap();
    let writer = DelimitedFileItemWriterBuilder::<Book>::new()
        .from_path(&output)
        .unwrap();

    let step = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let execution = step.execute();

    assert_eq!(execution.status, BatchStatus::Failed);
    match execution.failure {
        Some(BatchError::ItemReader(message)) => {
            assert!(message.contains("line 3"), "{}", message)
        }
        other => panic!("Expected BatchError::ItemReader, got {:?}", other),
    }
    assert_eq!(execution.read_count, 1);
    assert_eq!(execution.write_count, 0);
    assert!(!writer.is_open());
    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn blank_line_in_the_input_fails_the_step() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("books.csv");

    fs::write(
        &input,
        "title;author;isbn;publisher;publishedOn
Lavinia;Ursula K. Le Guin;9780151014248;Harcourt;2008

Malafrena;Ursula K. Le Guin;9780312283209;Putnam;1979
",
    )
    .unwrap();

    let reader = DelimitedFileItemReaderBuilder::<Book>::new()
        .delimiter(b';')
        .names(&BOOK_FILE_FIELDS)
        .from_path(&input)
        .unwrap();
    let writer = RecordingWriter::default();

    let step = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let execution = step.execute();

    assert_eq!(execution.status, BatchStatus::Failed);
    match execution.failure {
        Some(BatchError::ItemReader(message)) => {
            assert!(message.contains("line 3"), "{}", message);
            assert!(message.contains("found 0"), "{}", message);
        }
        other => panic!("Expected BatchError::ItemReader, got {:?}", other),
    }
    assert_eq!(execution.read_count, 1);
    assert!(writer.batches.borrow().is_empty());
}

#[test]
fn missing_input_file_fails_the_step() {
    let dir = tempdir().unwrap();

    let reader = DelimitedFileItemReaderBuilder::<Book>::new()
        .from_path(dir.path().join("missing.csv"))
        .unwrap();
    let writer = RecordingWriter::default();

    let step = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .build()
        .unwrap();

    let execution = step.execute();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert!(matches!(execution.failure, Some(BatchError::ItemReader(_))));
    assert!(writer.closed.get());
}

#[test]
fn destination_write_error_fails_the_step() {
    let mut file = MockFile::default();
    file.expect_write().times(1).returning(|_buf| {
        let err = io::Error::from(ErrorKind::PermissionDenied);
        Result::Err(err)
    });
    file.expect_flush().returning(|| Ok(()));

    let reader = InMemoryReader::new(vec![
        book("Rocannon's World", 1966),
        book("Planet of Exile", 1966),
    ]);
    let writer = DelimitedFileItemWriterBuilder::<Book>::new()
        .from_writer(file)
        .unwrap();

    let step = StepBuilder::<Book, Book>::new()
        .reader(&reader)
        .writer(&writer)
        .chunk(1)
        .build()
        .unwrap();

    let execution = step.execute();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert!(matches!(execution.failure, Some(BatchError::ItemWriter(_))));
    assert_eq!(execution.read_count, 1);
    assert_eq!(execution.write_count, 0);
    assert_eq!(reader.remaining(), 1);
}
