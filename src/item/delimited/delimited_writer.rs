use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    marker::PhantomData,
    path::Path,
};

use csv::WriterBuilder;
use log::debug;

use crate::{
    BatchError,
    core::{
        item::{ItemWriter, ItemWriterResult},
        record::{Field, Record, resolve_fields},
    },
};

use super::Opener;

/// Writes records as delimited lines, one record per line, without header.
///
/// Each chunk is first rendered into an in-memory buffer and only appended to
/// the destination once every record of the chunk has been rendered, so a
/// failing chunk leaves nothing behind. Values are quoted only when needed.
pub struct DelimitedFileItemWriter<T: 'static, W: Write> {
    fields: Vec<&'static Field<T>>,
    delimiter: u8,
    stream: RefCell<Option<W>>,
    opener: RefCell<Option<Opener<W>>>,
    owns_stream: bool,
}

impl<T: Record, W: Write> DelimitedFileItemWriter<T, W> {
    /// Whether the destination handle is currently held by the writer.
    pub fn is_open(&self) -> bool {
        self.stream.borrow().is_some()
    }

    /// Returns the underlying writer, if it has not been released.
    pub fn into_inner(self) -> Option<W> {
        self.stream.into_inner()
    }

    fn ensure_open(&self) -> Result<(), BatchError> {
        if let Some((destination, open)) = self.opener.borrow_mut().take() {
            let stream = open().map_err(|error| {
                BatchError::ItemWriter(format!("Unable to open {}: {}", destination, error))
            })?;
            *self.stream.borrow_mut() = Some(stream);
            debug!("Opened {} for writing", destination);
        }
        Ok(())
    }

    fn render(&self, items: &[T]) -> Result<Vec<u8>, BatchError> {
        let mut buffer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(Vec::new());

        for item in items {
            buffer
                .write_record(self.fields.iter().map(|field| (field.get)(item).to_string()))
                .map_err(|error| BatchError::ItemWriter(error.to_string()))?;
        }

        buffer
            .into_inner()
            .map_err(|error| BatchError::ItemWriter(error.to_string()))
    }
}

impl<T: Record, W: Write> ItemWriter<T> for DelimitedFileItemWriter<T, W> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.ensure_open()?;

        let lines = self.render(items)?;

        let mut guard = self.stream.borrow_mut();
        let stream = guard
            .as_mut()
            .ok_or_else(|| BatchError::ItemWriter("writer is closed".to_string()))?;

        stream
            .write_all(&lines)
            .map_err(|error| BatchError::ItemWriter(error.to_string()))
    }

    /// Flush the destination so that the chunk reaches the underlying storage.
    fn flush(&self) -> ItemWriterResult {
        match self.stream.borrow_mut().as_mut() {
            Some(stream) => stream
                .flush()
                .map_err(|error| BatchError::ItemWriter(error.to_string())),
            None => Ok(()),
        }
    }

    fn open(&self) -> ItemWriterResult {
        self.ensure_open()
    }

    /// Flushes and, for a writer built from a path, releases the file handle.
    fn close(&self) -> ItemWriterResult {
        self.opener.borrow_mut().take();
        let result = ItemWriter::<T>::flush(self);

        if self.owns_stream {
            self.stream.borrow_mut().take();
        }

        result
    }
}

/// A builder for configuring delimited file writing.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Names: every field of the record, in declaration order
pub struct DelimitedFileItemWriterBuilder<T> {
    delimiter: u8,
    names: Vec<String>,
    _record: PhantomData<T>,
}

impl<T: Record> Default for DelimitedFileItemWriterBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> DelimitedFileItemWriterBuilder<T> {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            names: T::fields().iter().map(|field| field.name.to_string()).collect(),
            _record: PhantomData,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Fields written on each line, in order. Any subset of the record's
    /// fields is accepted.
    pub fn names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.names = names.iter().map(|name| name.as_ref().to_string()).collect();
        self
    }

    fn resolve(&self) -> Result<Vec<&'static Field<T>>, BatchError> {
        let fields = resolve_fields::<T, _>(&self.names)?;

        if fields.is_empty() {
            return Err(BatchError::Configuration(
                "at least one field must be written".to_string(),
            ));
        }

        Ok(fields)
    }

    /// Creates a writer over an existing destination, such as a `Vec<u8>`.
    ///
    /// The destination stays owned by the writer after `close` so that it can
    /// be recovered with [`DelimitedFileItemWriter::into_inner`].
    pub fn from_writer<W: Write>(
        self,
        wtr: W,
    ) -> Result<DelimitedFileItemWriter<T, W>, BatchError> {
        Ok(DelimitedFileItemWriter {
            fields: self.resolve()?,
            delimiter: self.delimiter,
            stream: RefCell::new(Some(wtr)),
            opener: RefCell::new(None),
            owns_stream: false,
        })
    }

    /// Creates a writer over a file created (or truncated) when the writer is
    /// opened, and closed when the writer is closed.
    pub fn from_path<P: AsRef<Path>>(
        self,
        path: P,
    ) -> Result<DelimitedFileItemWriter<T, File>, BatchError> {
        let path = path.as_ref().to_path_buf();
        let destination = path.display().to_string();
        let open: Box<dyn FnOnce() -> io::Result<File>> = Box::new(move || File::create(path));

        Ok(DelimitedFileItemWriter {
            fields: self.resolve()?,
            delimiter: self.delimiter,
            stream: RefCell::new(None),
            opener: RefCell::new(Some((destination, open))),
            owns_stream: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, Write},
    };

    use tempfile::tempdir;

    use super::DelimitedFileItemWriterBuilder;
    use crate::{BatchError, book::Book, core::item::ItemWriter};

    fn book(title: &str, year: i32) -> Book {
        Book {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            isbn: "9780441013593".to_string(),
            publisher: "Ace".to_string(),
            published_year: year,
        }
    }

    /// Accepts a limited number of bytes, then fails.
    struct FullDisk {
        written: Vec<u8>,
        capacity: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() + buf.len() > self.capacity {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn records_are_written_one_per_line_without_header() {
        let writer = DelimitedFileItemWriterBuilder::<Book>::new()
            .from_writer(vec![])
            .unwrap();

        writer.write(&[book("Dune", 1965), book("Children of Dune", 1976)]).unwrap();
        ItemWriter::<Book>::flush(&writer).unwrap();

        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(
            data,
            "Dune,Frank Herbert,9780441013593,Ace,1965
Children of Dune,Frank Herbert,9780441013593,Ace,1976
"
        );
    }

    #[test]
    fn extractor_list_selects_and_orders_fields() {
        let writer = DelimitedFileItemWriterBuilder::<Book>::new()
            .delimiter(b'|')
            .names(&["publishedOn", "title"])
            .from_writer(vec![])
            .unwrap();

        writer.write(&[book("Dune, Messiah", 1969)]).unwrap();

        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(data, "1969|Dune, Messiah\n");
    }

    #[test]
    fn value_containing_the_delimiter_is_quoted() {
        let writer = DelimitedFileItemWriterBuilder::<Book>::new()
            .names(&["title", "publishedOn"])
            .from_writer(vec![])
            .unwrap();

        writer.write(&[book("Dune, Messiah", 1969)]).unwrap();

        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(data, "\"Dune, Messiah\",1969\n");
    }

    #[test]
    fn unknown_extractor_is_rejected_when_building() {
        let result = DelimitedFileItemWriterBuilder::<Book>::new()
            .names(&["title", "pages"])
            .from_writer(vec![]);

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }

    #[test]
    fn failing_chunk_is_not_partially_written() {
        let writer = DelimitedFileItemWriterBuilder::<Book>::new()
            .names(&["title"])
            .from_writer(FullDisk {
                written: Vec::new(),
                capacity: 8,
            })
            .unwrap();

        writer.write(&[book("Dune", 1965)]).unwrap();
        let result = writer.write(&[book("Emma", 1815), book("Ulysses", 1922)]);

        assert!(matches!(result, Err(BatchError::ItemWriter(_))));
        let disk = writer.into_inner().unwrap();
        assert_eq!(disk.written, b"Dune\n");
    }

    #[test]
    fn path_writer_creates_file_on_open_and_releases_it_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.csv");

        let writer = DelimitedFileItemWriterBuilder::<Book>::new()
            .names(&["title"])
            .from_path(&path)
            .unwrap();

        assert!(!path.exists());
        assert!(!writer.is_open());

        ItemWriter::<Book>::open(&writer).unwrap();
        assert!(writer.is_open());
        writer.write(&[book("Dune", 1965)]).unwrap();
        ItemWriter::<Book>::close(&writer).unwrap();

        assert!(!writer.is_open());
        assert_eq!(fs::read_to_string(&path).unwrap(), "Dune\n");
        assert!(matches!(
            writer.write(&[book("Emma", 1815)]),
            Err(BatchError::ItemWriter(_))
        ));
    }
}
