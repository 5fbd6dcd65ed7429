use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use log::debug;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    BatchError,
    core::{
        item::{ItemReader, ItemReaderResult},
        record::{Field, FieldKind, FieldValue, Record, ensure_complete, resolve_fields},
    },
};

use super::block_on;

/// Reads records from the rows of a SQLite query.
///
/// Rows are fetched in one go, or page by page when a page size is set, in
/// which case `LIMIT` and `OFFSET` clauses are appended to the query. Each row
/// is mapped through an explicit `(column, field)` list that covers every
/// field of the record.
///
/// Blocking on the database requires a multi-thread Tokio runtime.
pub struct TableItemReader<'a, T: 'static> {
    pool: &'a Pool<Sqlite>,
    query: String,
    page_size: Option<usize>,
    mapping: Vec<(String, &'static Field<T>)>,
    offset: Cell<usize>,
    exhausted: Cell<bool>,
    buffer: RefCell<VecDeque<T>>,
}

impl<T: Record> TableItemReader<'_, T> {
    fn page_query(&self) -> String {
        match self.page_size {
            Some(page_size) => format!(
                "{} LIMIT {} OFFSET {}",
                self.query,
                page_size,
                self.offset.get()
            ),
            None => self.query.clone(),
        }
    }

    fn read_page(&self) -> Result<(), BatchError> {
        let query = self.page_query();
        debug!("Fetching rows: {}", query);

        let rows = block_on(async { sqlx::query(&query).fetch_all(self.pool).await })
            .map_err(BatchError::ItemReader)?
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;

        let fetched = rows.len();
        self.offset.set(self.offset.get() + fetched);
        self.exhausted
            .set(self.page_size.is_none_or(|page_size| fetched < page_size));

        let mut buffer = self.buffer.borrow_mut();
        for row in &rows {
            buffer.push_back(self.map_row(row)?);
        }

        Ok(())
    }

    fn map_row(&self, row: &SqliteRow) -> Result<T, BatchError> {
        let mut item = T::default();

        for (column, field) in &self.mapping {
            let column_error =
                |error: String| BatchError::ItemReader(format!("column '{}': {}", column, error));

            let value = match field.kind {
                FieldKind::Text => row
                    .try_get::<String, _>(column.as_str())
                    .map(FieldValue::Text),
                FieldKind::Integer => row
                    .try_get::<i64, _>(column.as_str())
                    .map(FieldValue::Integer),
            }
            .map_err(|error| column_error(error.to_string()))?;

            (field.set)(&mut item, value).map_err(column_error)?;
        }

        Ok(item)
    }
}

impl<T: Record> ItemReader<T> for TableItemReader<'_, T> {
    /// Reads the next row.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a row is available
    /// - `Ok(None)` if every row has been read
    /// - `Err(BatchError::ItemReader(error))` if the query fails, a mapped
    ///   column is missing from the result or holds a value of the wrong type
    fn read(&self) -> ItemReaderResult<T> {
        if self.buffer.borrow().is_empty() && !self.exhausted.get() {
            self.read_page()?;
        }

        Ok(self.buffer.borrow_mut().pop_front())
    }

    fn close(&self) -> Result<(), BatchError> {
        self.buffer.borrow_mut().clear();
        self.exhausted.set(true);
        Ok(())
    }
}

/// Builder for [`TableItemReader`].
///
/// # Examples
///
/// ```no_run
/// use book_batch::book::{BOOK_TABLE_COLUMNS, Book};
/// use book_batch::item::rdbc::TableItemReaderBuilder;
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite://books.db").await?;
///
/// let reader = TableItemReaderBuilder::<Book>::new()
///     .pool(&pool)
///     .query("SELECT title, author, isbn, publisher, year FROM Book")
///     .columns(&BOOK_TABLE_COLUMNS)
///     .page_size(100)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TableItemReaderBuilder<'a, T> {
    pool: Option<&'a Pool<Sqlite>>,
    query: Option<String>,
    page_size: Option<usize>,
    columns: Vec<(String, String)>,
    _record: std::marker::PhantomData<T>,
}

impl<T: Record> Default for TableItemReaderBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Record> TableItemReaderBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            pool: None,
            query: None,
            page_size: None,
            columns: Vec::new(),
            _record: std::marker::PhantomData,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Query without `LIMIT` or `OFFSET`; those are added when paging.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Maps a result column to a record field.
    pub fn column(mut self, column: &str, field: &str) -> Self {
        self.columns.push((column.to_string(), field.to_string()));
        self
    }

    /// Maps several `(column, field)` pairs at once.
    pub fn columns(self, columns: &[(&str, &str)]) -> Self {
        columns
            .iter()
            .fold(self, |builder, (column, field)| builder.column(column, field))
    }

    pub fn build(self) -> Result<TableItemReader<'a, T>, BatchError> {
        let pool = self
            .pool
            .ok_or_else(|| BatchError::Configuration("a pool is required".to_string()))?;
        let query = self
            .query
            .ok_or_else(|| BatchError::Configuration("a query is required".to_string()))?;

        if self.page_size == Some(0) {
            return Err(BatchError::Configuration(
                "page size must be at least 1".to_string(),
            ));
        }

        let names: Vec<&str> = self.columns.iter().map(|(_, field)| field.as_str()).collect();
        let fields = resolve_fields::<T, _>(&names)?;
        ensure_complete(&fields)?;

        let mapping = self
            .columns
            .iter()
            .map(|(column, _)| column.clone())
            .zip(fields)
            .collect();

        Ok(TableItemReader {
            pool,
            query,
            page_size: self.page_size,
            mapping,
            offset: Cell::new(0),
            exhausted: Cell::new(false),
            buffer: RefCell::new(VecDeque::new()),
        })
    }
}
