use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{self, Read},
    marker::PhantomData,
    path::Path,
};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::debug;

use crate::{
    core::{
        item::{ItemReader, ItemReaderResult},
        record::{Field, Record, ensure_complete, resolve_fields},
    },
    error::BatchError,
};

use super::{DEFAULT_LINES_TO_SKIP, Opener};

/// Reads records from delimited text, one line per record.
///
/// Values are mapped to record fields by position, following the ordered
/// name list given to the builder. The list must cover every field of the
/// record, so a record is either complete or not produced at all.
///
/// A line whose number of values differs from the name list is an error, as
/// is an integer field that does not parse. A blank line between records
/// counts as a line with no values. There is no best-effort parsing: the first
/// malformed line ends the read with [`BatchError::ItemReader`].
///
/// # Implementation Details
///
/// - The origin is opened lazily, by [`ItemReader::open`] or the first read,
///   and released by [`ItemReader::close`]
/// - Leading records (headers) are skipped on the first read
/// - Quoted values are supported, so a delimiter or a line break may appear
///   inside a value
/// - Blank lines after the last record are ignored
pub struct DelimitedFileItemReader<T: 'static, R> {
    fields: Vec<&'static Field<T>>,
    lines_to_skip: usize,
    trim: bool,
    csv: ReaderBuilder,
    opener: RefCell<Option<Opener<R>>>,
    records: RefCell<Option<StringRecordsIntoIter<R>>>,
    skipped: Cell<usize>,
    /// Line reached by the underlying reader after the last record.
    consumed_lines: Cell<u64>,
}

impl<T: Record, R: Read> DelimitedFileItemReader<T, R> {
    fn ensure_open(&self) -> Result<(), BatchError> {
        if let Some((origin, open)) = self.opener.borrow_mut().take() {
            let rdr = open().map_err(|error| {
                BatchError::ItemReader(format!("Unable to open {}: {}", origin, error))
            })?;
            *self.records.borrow_mut() = Some(self.csv.from_reader(rdr).into_records());
            debug!("Opened {} for reading", origin);
        }
        Ok(())
    }

    /// Pulls the next record, failing when blank lines come before it.
    ///
    /// `csv` drops empty lines silently. They are counted as the line breaks
    /// consumed by a read beyond the record's own terminator and the breaks
    /// inside its quoted values.
    fn next_record(
        &self,
        records: &mut StringRecordsIntoIter<R>,
    ) -> Result<Option<StringRecord>, BatchError> {
        let record = match records.next() {
            Some(Ok(record)) => record,
            Some(Err(error)) => return Err(BatchError::ItemReader(error.to_string())),
            None => return Ok(None),
        };

        let line = records.reader().position().line();
        let consumed = line - self.consumed_lines.replace(line);
        let breaks: usize = record.iter().map(|value| value.matches('\n').count()).sum();

        if consumed > breaks as u64 + 1 {
            return Err(BatchError::ItemReader(format!(
                "line {}: expected {} fields but found 0",
                record.position().map_or(line, |position| position.line()),
                self.fields.len()
            )));
        }

        Ok(Some(record))
    }

    fn map_record(&self, record: &StringRecord) -> Result<T, BatchError> {
        let line = record.position().map_or(0, |position| position.line());

        if record.len() != self.fields.len() {
            return Err(BatchError::ItemReader(format!(
                "line {}: expected {} fields but found {}",
                line,
                self.fields.len(),
                record.len()
            )));
        }

        let mut item = T::default();

        for (field, raw) in self.fields.iter().zip(record.iter()) {
            let raw = if self.trim { raw.trim() } else { raw };

            field
                .kind
                .parse(raw)
                .and_then(|value| (field.set)(&mut item, value))
                .map_err(|error| {
                    BatchError::ItemReader(format!(
                        "line {}, field '{}': {}",
                        line, field.name, error
                    ))
                })?;
        }

        Ok(item)
    }
}

impl<T: Record, R: Read> ItemReader<T> for DelimitedFileItemReader<T, R> {
    /// Reads the next record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a line is successfully mapped
    /// - `Ok(None)` if there are no more lines, or the reader was closed
    /// - `Err(BatchError::ItemReader(error))` if the origin cannot be opened,
    ///   a line cannot be read or it does not match the declared fields
    fn read(&self) -> ItemReaderResult<T> {
        self.ensure_open()?;

        let mut guard = self.records.borrow_mut();
        let Some(records) = guard.as_mut() else {
            return Ok(None);
        };

        while self.skipped.get() < self.lines_to_skip {
            if self.next_record(records)?.is_none() {
                return Ok(None);
            }
            self.skipped.set(self.skipped.get() + 1);
        }

        match self.next_record(records)? {
            Some(record) => self.map_record(&record).map(Some),
            None => Ok(None),
        }
    }

    fn open(&self) -> Result<(), BatchError> {
        self.ensure_open()
    }

    fn close(&self) -> Result<(), BatchError> {
        self.opener.borrow_mut().take();
        self.records.borrow_mut().take();
        Ok(())
    }
}

/// A builder for configuring delimited file reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Lines to skip: 1 (a header line)
/// - Names: every field of the record, in declaration order
/// - Trimming: disabled
pub struct DelimitedFileItemReaderBuilder<T> {
    delimiter: u8,
    lines_to_skip: usize,
    names: Vec<String>,
    trim: bool,
    _record: PhantomData<T>,
}

impl<T: Record> Default for DelimitedFileItemReaderBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> DelimitedFileItemReaderBuilder<T> {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            lines_to_skip: DEFAULT_LINES_TO_SKIP,
            names: T::fields().iter().map(|field| field.name.to_string()).collect(),
            trim: false,
            _record: PhantomData,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of leading records ignored before mapping starts.
    pub fn lines_to_skip(mut self, lines_to_skip: usize) -> Self {
        self.lines_to_skip = lines_to_skip;
        self
    }

    /// Field names in the order their values appear on a line.
    pub fn names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.names = names.iter().map(|name| name.as_ref().to_string()).collect();
        self
    }

    /// Trims surrounding whitespace from every value.
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = yes;
        self
    }

    fn resolve(&self) -> Result<(Vec<&'static Field<T>>, ReaderBuilder), BatchError> {
        let fields = resolve_fields::<T, _>(&self.names)?;
        ensure_complete(&fields)?;

        // Values are trimmed when mapped, so line breaks inside quoted values
        // stay countable.
        let mut csv = ReaderBuilder::new();
        csv.delimiter(self.delimiter)
            .has_headers(false)
            // Value count is checked against the name list, not the first line
            .flexible(true);

        Ok((fields, csv))
    }

    /// Creates a reader over any `Read` source, such as a string or a socket.
    ///
    /// # Errors
    /// `BatchError::Configuration` if the name list is invalid for `T`.
    pub fn from_reader<R: Read>(
        self,
        rdr: R,
    ) -> Result<DelimitedFileItemReader<T, R>, BatchError> {
        let (fields, csv) = self.resolve()?;
        let records = csv.from_reader(rdr).into_records();

        Ok(DelimitedFileItemReader {
            fields,
            lines_to_skip: self.lines_to_skip,
            trim: self.trim,
            csv,
            opener: RefCell::new(None),
            records: RefCell::new(Some(records)),
            skipped: Cell::new(0),
            consumed_lines: Cell::new(1),
        })
    }

    /// Creates a reader over a file opened when the reader is opened.
    ///
    /// # Errors
    /// `BatchError::Configuration` if the name list is invalid for `T`. A
    /// missing file is only reported when the reader is opened.
    pub fn from_path<P: AsRef<Path>>(
        self,
        path: P,
    ) -> Result<DelimitedFileItemReader<T, File>, BatchError> {
        let (fields, csv) = self.resolve()?;
        let path = path.as_ref().to_path_buf();
        let origin = path.display().to_string();
        let open: Box<dyn FnOnce() -> io::Result<File>> = Box::new(move || File::open(path));

        Ok(DelimitedFileItemReader {
            fields,
            lines_to_skip: self.lines_to_skip,
            trim: self.trim,
            csv,
            opener: RefCell::new(Some((origin, open))),
            records: RefCell::new(None),
            skipped: Cell::new(0),
            consumed_lines: Cell::new(1),
        })
    }
}
