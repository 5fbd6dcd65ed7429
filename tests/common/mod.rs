#![allow(dead_code, unused_imports)]

mod mocks;

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use book_batch::{
    BatchError,
    book::Book,
    core::{
        item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult},
        listener::StepExecutionListener,
        step::StepExecution,
    },
};

pub use mocks::MockFile;

pub fn book(title: &str, year: i32) -> Book {
    Book {
        title: title.to_string(),
        author: "Ursula K. Le Guin".to_string(),
        isbn: format!("isbn-{}", title),
        publisher: "Ace".to_string(),
        published_year: year,
    }
}

/// Serves a fixed list of items and records how it was used.
pub struct InMemoryReader<T> {
    items: RefCell<VecDeque<T>>,
    pub reads: Cell<usize>,
    pub opened: Cell<bool>,
    pub closed: Cell<bool>,
    fail_on_read: Option<usize>,
}

impl<T> InMemoryReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items.into()),
            reads: Cell::new(0),
            opened: Cell::new(false),
            closed: Cell::new(false),
            fail_on_read: None,
        }
    }

    /// Fails the `n`th call to `read`, starting at 1.
    pub fn failing_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    pub fn remaining(&self) -> usize {
        self.items.borrow().len()
    }
}

impl<T> ItemReader<T> for InMemoryReader<T> {
    fn read(&self) -> ItemReaderResult<T> {
        self.reads.set(self.reads.get() + 1);

        if self.fail_on_read == Some(self.reads.get()) {
            return Err(BatchError::ItemReader("corrupted record".to_string()));
        }

        Ok(self.items.borrow_mut().pop_front())
    }

    fn open(&self) -> Result<(), BatchError> {
        self.opened.set(true);
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        self.closed.set(true);
        Ok(())
    }
}

/// Keeps every committed batch in memory.
pub struct RecordingWriter<T> {
    pub batches: RefCell<Vec<Vec<T>>>,
    pub opened: Cell<bool>,
    pub closed: Cell<bool>,
    fail_on_batch: Option<usize>,
    fail_on_open: bool,
    fail_on_close: bool,
    calls: Cell<usize>,
}

impl<T> Default for RecordingWriter<T> {
    fn default() -> Self {
        Self {
            batches: RefCell::new(Vec::new()),
            opened: Cell::new(false),
            closed: Cell::new(false),
            fail_on_batch: None,
            fail_on_open: false,
            fail_on_close: false,
            calls: Cell::new(0),
        }
    }
}

impl<T> RecordingWriter<T> {
    /// Fails the `n`th batch, starting at 1.
    pub fn failing_on_batch(mut self, n: usize) -> Self {
        self.fail_on_batch = Some(n);
        self
    }

    pub fn failing_on_open(mut self) -> Self {
        self.fail_on_open = true;
        self
    }

    /// Releases the destination, then reports an error.
    pub fn failing_on_close(mut self) -> Self {
        self.fail_on_close = true;
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.borrow().iter().map(Vec::len).collect()
    }
}

impl<T: Clone> ItemWriter<T> for RecordingWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.calls.set(self.calls.get() + 1);

        if self.fail_on_batch == Some(self.calls.get()) {
            return Err(BatchError::ItemWriter("destination unavailable".to_string()));
        }

        self.batches.borrow_mut().push(items.to_vec());
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        if self.fail_on_open {
            return Err(BatchError::ItemWriter("destination locked".to_string()));
        }

        self.opened.set(true);
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        self.closed.set(true);

        if self.fail_on_close {
            return Err(BatchError::ItemWriter("destination not released".to_string()));
        }

        Ok(())
    }
}

/// Collects the summaries it is notified with.
#[derive(Default)]
pub struct CollectingListener {
    pub started: Cell<usize>,
    pub finished: RefCell<Vec<StepExecution>>,
}

impl StepExecutionListener for CollectingListener {
    fn before_step(&self, _execution: &StepExecution) {
        self.started.set(self.started.get() + 1);
    }

    fn after_step(&self, execution: &StepExecution) {
        self.finished.borrow_mut().push(execution.clone());
    }
}
