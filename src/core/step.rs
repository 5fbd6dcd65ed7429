use std::{
    cell::RefCell,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    chunk::Chunk,
    item::{ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor},
    listener::StepExecutionListener,
};

/// Number of items per chunk when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

static PASS_THROUGH: PassThroughProcessor = PassThroughProcessor;

/// Lifecycle of a step execution.
///
/// `Completed` and `Failed` are terminal: once reached, the execution never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Built but not executed yet.
    Starting,
    /// Reading, processing and writing chunks.
    Started,
    /// Input exhausted and every chunk committed.
    Completed,
    /// Ended by a reader, processor or writer error, or by cancellation.
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

/// Summary of one run of a [`ChunkOrientedStep`].
///
/// Created when the run starts, updated only by the step, and frozen once the
/// status is terminal.
#[derive(Debug, Clone, Serialize)]
pub struct StepExecution {
    /// Unique identifier of the run
    pub id: Uuid,
    pub name: String,
    pub status: BatchStatus,
    /// Number of items returned by the reader
    pub read_count: usize,
    /// Number of items accepted by the processor
    pub process_count: usize,
    /// Number of items dropped by the processor
    pub filter_count: usize,
    /// Number of items in successfully committed chunks
    pub write_count: usize,
    /// Number of successfully committed chunks
    pub commit_count: usize,
    /// Cause of a `Failed` status
    pub failure: Option<BatchError>,
    #[serde(skip)]
    pub start: Instant,
    #[serde(skip)]
    pub end: Option<Instant>,
    pub duration: Duration,
}

impl StepExecution {
    fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: BatchStatus::Starting,
            read_count: 0,
            process_count: 0,
            filter_count: 0,
            write_count: 0,
            commit_count: 0,
            failure: None,
            start: Instant::now(),
            end: None,
            duration: Duration::ZERO,
        }
    }

    fn finish(&mut self, outcome: Result<(), BatchError>) {
        let end = Instant::now();
        self.end = Some(end);
        self.duration = end.duration_since(self.start);

        match outcome {
            Ok(()) => self.status = BatchStatus::Completed,
            Err(error) => {
                self.status = BatchStatus::Failed;
                self.failure = Some(error);
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

/// Reads items one by one, processes them and writes them by chunks.
///
/// The step owns no resource itself: reader and writer are opened when
/// [`execute`](ChunkOrientedStep::execute) starts and always closed before it
/// returns, whether the run completed or failed. Build one with
/// [`StepBuilder`].
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    reader: &'a dyn ItemReader<I>,
    processor: &'a dyn ItemProcessor<I, O>,
    writer: &'a dyn ItemWriter<O>,
    listeners: Vec<&'a dyn StepExecutionListener>,
    chunk_size: usize,
    cancellation: Option<CancellationToken>,
    last_execution: RefCell<Option<StepExecution>>,
}

impl<'a, I, O> ChunkOrientedStep<'a, I, O> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Status of the last execution, `Starting` if the step never ran.
    pub fn get_status(&self) -> BatchStatus {
        self.last_execution
            .borrow()
            .as_ref()
            .map_or(BatchStatus::Starting, |execution| execution.status)
    }

    /// Runs the step to a terminal status and returns its summary.
    ///
    /// Listeners are notified exactly once, after resources have been
    /// released. Calling `execute` again on a finished step returns the same
    /// summary without reading or writing anything.
    pub fn execute(&self) -> StepExecution {
        if let Some(execution) = self.last_execution.borrow().as_ref() {
            warn!(
                "Step {} already ended with status {:?}, not executed again",
                self.name, execution.status
            );
            return execution.clone();
        }

        let mut execution = StepExecution::new(&self.name);
        execution.status = BatchStatus::Started;

        info!("Start of step: {}, id: {}", execution.name, execution.id);
        self.listeners
            .iter()
            .for_each(|listener| listener.before_step(&execution));

        let mut outcome = self
            .open()
            .and_then(|()| self.process_items(&mut execution));

        if let Err(close_error) = self.close() {
            if outcome.is_ok() {
                outcome = Err(close_error);
            } else {
                error!(
                    "Error while releasing resources of failed step {}: {}",
                    self.name, close_error
                );
            }
        }

        execution.finish(outcome);

        match &execution.failure {
            None => info!(
                "End of step: {}, id: {}, status: {:?}",
                execution.name, execution.id, execution.status
            ),
            Some(cause) => error!(
                "End of step: {}, id: {}, status: {:?}, cause: {}",
                execution.name, execution.id, execution.status, cause
            ),
        }

        self.listeners
            .iter()
            .for_each(|listener| listener.after_step(&execution));

        *self.last_execution.borrow_mut() = Some(execution.clone());
        execution
    }

    fn open(&self) -> Result<(), BatchError> {
        self.reader.open()?;
        self.writer.open()
    }

    fn close(&self) -> Result<(), BatchError> {
        let reader_result = self.reader.close();
        let writer_result = self.writer.close();
        writer_result.and(reader_result)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    fn process_items(&self, execution: &mut StepExecution) -> Result<(), BatchError> {
        let mut chunk = Chunk::new(self.chunk_size);

        loop {
            if self.is_cancelled() {
                info!(
                    "Step {} cancelled after {} items read",
                    self.name, execution.read_count
                );
                self.write_chunk(&mut chunk, execution)?;
                return Err(BatchError::Cancelled);
            }

            let item = match self.reader.read() {
                Ok(Some(item)) => item,
                Ok(None) => {
                    debug!("All items of reader have been read");
                    return self.write_chunk(&mut chunk, execution);
                }
                Err(error) => {
                    error!("Error occurred during read item: {}", error);
                    return Err(error);
                }
            };
            execution.read_count += 1;

            match self.processor.process(&item) {
                Ok(Some(processed)) => {
                    execution.process_count += 1;
                    chunk.push(processed);

                    if chunk.is_full() {
                        self.write_chunk(&mut chunk, execution)?;
                    }
                }
                Ok(None) => execution.filter_count += 1,
                Err(error) => {
                    error!("Error occurred during process item: {}", error);
                    return Err(error);
                }
            }
        }
    }

    fn write_chunk(
        &self,
        chunk: &mut Chunk<O>,
        execution: &mut StepExecution,
    ) -> Result<(), BatchError> {
        if chunk.is_empty() {
            return Ok(());
        }

        debug!("Start writing chunk of {} items", chunk.len());

        match self
            .writer
            .write(chunk.items())
            .and_then(|()| self.writer.flush())
        {
            Ok(()) => {
                execution.write_count += chunk.len();
                execution.commit_count += 1;
                chunk.clear();
                debug!("End writing chunk");
                Ok(())
            }
            Err(error) => {
                error!("ItemWriter error: {}", error);
                Err(error)
            }
        }
    }
}

/// Fluent builder for [`ChunkOrientedStep`].
///
/// Reader and writer are mandatory. Without a processor, items are passed
/// through unchanged; without a name, a random one is generated.
pub struct StepBuilder<'a, I, O> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    listeners: Vec<&'a dyn StepExecutionListener>,
    chunk_size: usize,
    cancellation: Option<CancellationToken>,
}

impl<I, O> Default for StepBuilder<'_, I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, I, O> StepBuilder<'a, I, O> {
    pub fn new() -> StepBuilder<'a, I, O> {
        Self {
            name: None,
            reader: None,
            processor: None,
            writer: None,
            listeners: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancellation: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> StepBuilder<'a, I, O> {
        self.name = Some(name.into());
        self
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<I>) -> StepBuilder<'a, I, O> {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<I, O>) -> StepBuilder<'a, I, O> {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<O>) -> StepBuilder<'a, I, O> {
        self.writer = Some(writer);
        self
    }

    /// Registers a listener notified when the step starts and ends.
    pub fn listener(mut self, listener: &'a dyn StepExecutionListener) -> StepBuilder<'a, I, O> {
        self.listeners.push(listener);
        self
    }

    /// Sets the commit interval: number of processed items written per chunk.
    pub fn chunk(mut self, chunk_size: usize) -> StepBuilder<'a, I, O> {
        self.chunk_size = chunk_size;
        self
    }

    /// Lets the step be stopped cooperatively; the token is checked before
    /// every read.
    pub fn cancellation_token(mut self, token: CancellationToken) -> StepBuilder<'a, I, O> {
        self.cancellation = Some(token);
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError>
    where
        PassThroughProcessor: ItemProcessor<I, O>,
    {
        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("a reader is required".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("a writer is required".to_string()))?;

        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }

        let pass_through: &'a dyn ItemProcessor<I, O> = &PASS_THROUGH;

        Ok(ChunkOrientedStep {
            name: self.name.unwrap_or_else(build_name),
            reader,
            processor: self.processor.unwrap_or(pass_through),
            writer,
            listeners: self.listeners,
            chunk_size: self.chunk_size,
            cancellation: self.cancellation,
            last_execution: RefCell::new(None),
        })
    }
}
