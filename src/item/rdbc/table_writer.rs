use log::{debug, warn};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    BatchError,
    core::{
        item::{ItemWriter, ItemWriterResult},
        record::{Field, FieldValue, Record, resolve_fields},
    },
};

use super::{BIND_LIMIT, block_on};

/// Inserts records into a SQLite table.
///
/// Each batch is written in its own transaction, with as few multi-row
/// `INSERT` statements as the bind parameter limit allows. If any statement
/// fails the transaction is rolled back, so a batch is either entirely in the
/// table or not at all.
pub struct TableItemWriter<'a, T: 'static> {
    pool: &'a Pool<Sqlite>,
    table: String,
    mapping: Vec<(String, &'static Field<T>)>,
}

impl<T: Record> TableItemWriter<'_, T> {
    async fn insert(
        &self,
        connection: &mut SqliteConnection,
        items: &[T],
    ) -> Result<(), sqlx::Error> {
        let columns: Vec<&str> = self.mapping.iter().map(|(column, _)| column.as_str()).collect();
        let rows_per_statement = (BIND_LIMIT / self.mapping.len()).max(1);

        for rows in items.chunks(rows_per_statement) {
            let mut query_builder = QueryBuilder::<Sqlite>::new("INSERT INTO ");
            query_builder.push(&self.table);
            query_builder.push(" (");
            query_builder.push(columns.join(", "));
            query_builder.push(") ");

            query_builder.push_values(rows, |mut values, item| {
                for (_, field) in &self.mapping {
                    match (field.get)(item) {
                        FieldValue::Text(text) => values.push_bind(text),
                        FieldValue::Integer(value) => values.push_bind(value),
                    };
                }
            });

            query_builder.build().execute(&mut *connection).await?;
        }

        Ok(())
    }

    async fn write_batch(&self, items: &[T]) -> Result<(), sqlx::Error> {
        let mut transaction = self.pool.begin().await?;

        match self.insert(&mut transaction, items).await {
            Ok(()) => transaction.commit().await,
            Err(error) => {
                if let Err(rollback_error) = transaction.rollback().await {
                    warn!("Rollback on table {} failed: {}", self.table, rollback_error);
                }
                Err(error)
            }
        }
    }
}

impl<T: Record> ItemWriter<T> for TableItemWriter<'_, T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(());
        }

        debug!("Inserting {} rows into {}", items.len(), self.table);

        block_on(self.write_batch(items))
            .map_err(BatchError::ItemWriter)?
            .map_err(|error| BatchError::ItemWriter(format!("SQLite write failed: {}", error)))
    }
}

/// Builder for [`TableItemWriter`].
///
/// # Examples
///
/// ```no_run
/// use book_batch::book::{BOOK_TABLE_COLUMNS, Book};
/// use book_batch::item::rdbc::TableItemWriterBuilder;
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite://books.db").await?;
///
/// let writer = TableItemWriterBuilder::<Book>::new()
///     .pool(&pool)
///     .table("Book")
///     .columns(&BOOK_TABLE_COLUMNS)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TableItemWriterBuilder<'a, T> {
    pool: Option<&'a Pool<Sqlite>>,
    table: Option<String>,
    columns: Vec<(String, String)>,
    _record: std::marker::PhantomData<T>,
}

impl<T: Record> Default for TableItemWriterBuilder<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Record> TableItemWriterBuilder<'a, T> {
    pub fn new() -> Self {
        Self {
            pool: None,
            table: None,
            columns: Vec::new(),
            _record: std::marker::PhantomData,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Fills `column` with the value of `field`.
    pub fn column(mut self, column: &str, field: &str) -> Self {
        self.columns.push((column.to_string(), field.to_string()));
        self
    }

    pub fn columns(self, columns: &[(&str, &str)]) -> Self {
        columns
            .iter()
            .fold(self, |builder, (column, field)| builder.column(column, field))
    }

    pub fn build(self) -> Result<TableItemWriter<'a, T>, BatchError> {
        let pool = self
            .pool
            .ok_or_else(|| BatchError::Configuration("a pool is required".to_string()))?;
        let table = self
            .table
            .ok_or_else(|| BatchError::Configuration("a table is required".to_string()))?;

        if self.columns.is_empty() {
            return Err(BatchError::Configuration(
                "at least one column must be written".to_string(),
            ));
        }

        let names: Vec<&str> = self.columns.iter().map(|(_, field)| field.as_str()).collect();
        let fields = resolve_fields::<T, _>(&names)?;

        let mapping = self
            .columns
            .iter()
            .map(|(column, _)| column.clone())
            .zip(fields)
            .collect();

        Ok(TableItemWriter {
            pool,
            table,
            mapping,
        })
    }
}
