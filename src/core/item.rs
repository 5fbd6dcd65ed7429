use crate::error::BatchError;

/// Result of [`ItemReader::read`]: `Ok(None)` signals the end of input.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of [`ItemProcessor::process`]: `Ok(None)` means the item is filtered.
pub type ItemProcessorResult<O> = Result<Option<O>, BatchError>;

/// Result of the [`ItemWriter`] operations.
pub type ItemWriterResult = Result<(), BatchError>;

/// Produces a finite, forward-only sequence of items, one per call.
///
/// Implementations must return items in a stable order for a given origin.
/// Any error is fatal to the step that drives the reader.
pub trait ItemReader<I> {
    /// Reads the next item, `Ok(None)` once the input is exhausted.
    fn read(&self) -> ItemReaderResult<I>;

    /// Acquires the underlying resource. Called once when a step starts.
    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    /// Releases the underlying resource. Called once when a step ends,
    /// whatever its outcome, even if `open` was never successful.
    fn close(&self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Business logic applied to every item between reading and writing.
///
/// Returning `Ok(None)` drops the item: it never reaches the writer and is
/// counted as filtered, not as an error.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Consumes items one chunk at a time.
///
/// A chunk is committed by a call to `write` followed by `flush`. Both must
/// behave as a single all-or-nothing unit: when either fails, none of the
/// chunk's items may be considered written.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Identity processor used when a step is built without one.
#[derive(Default, Debug, Clone, Copy)]
pub struct PassThroughProcessor;

impl<T: Clone> ItemProcessor<T, T> for PassThroughProcessor {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        Ok(Some(item.clone()))
    }
}
