use std::fmt::Debug;

use log::{debug, info};

use crate::core::item::{ItemProcessor, ItemProcessorResult};

/// Keeps the items matching a predicate, optionally transforming them.
///
/// Items rejected by the predicate are filtered: they are counted as such by
/// the step and never reach the writer.
///
/// # Examples
///
/// ```
/// use book_batch::core::item::ItemProcessor;
/// use book_batch::item::processor::FilteringProcessor;
///
/// let processor = FilteringProcessor::new(|word: &String| !word.is_empty())
///     .with_mapper(|word| word.to_uppercase());
///
/// assert_eq!(processor.process(&"dune".to_string())?, Some("DUNE".to_string()));
/// assert_eq!(processor.process(&String::new())?, None);
/// # Ok::<(), book_batch::BatchError>(())
/// ```
pub struct FilteringProcessor<T> {
    predicate: Box<dyn Fn(&T) -> bool>,
    mapper: Option<Box<dyn Fn(T) -> T>>,
}

impl<T> FilteringProcessor<T> {
    pub fn new(predicate: impl Fn(&T) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            mapper: None,
        }
    }

    /// Applies `mapper` to every kept item.
    pub fn with_mapper(mut self, mapper: impl Fn(T) -> T + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }
}

impl<T: Clone + Debug> ItemProcessor<T, T> for FilteringProcessor<T> {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        if !(self.predicate)(item) {
            debug!("Filtered {:?}", item);
            return Ok(None);
        }

        let kept = item.clone();
        Ok(Some(match &self.mapper {
            Some(mapper) => mapper(kept),
            None => kept,
        }))
    }
}

/// Identity processor logging every item it sees.
#[derive(Default, Debug, Clone, Copy)]
pub struct LoggingProcessor;

impl<T: Clone + Debug> ItemProcessor<T, T> for LoggingProcessor {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        info!("Processing {:?}", item);
        Ok(Some(item.clone()))
    }
}
