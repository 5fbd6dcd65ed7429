//! The `Book` record moved by the import and export jobs.

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    core::record::{Field, FieldKind, FieldValue, Record},
    item::processor::FilteringProcessor,
};

/// Books published after this year are not imported by default.
pub const DEFAULT_MAX_PUBLISHED_YEAR: i32 = 2019;

/// Column order of the import file.
pub const BOOK_FILE_FIELDS: [&str; 5] = ["title", "author", "isbn", "publisher", "publishedOn"];

/// Mapping between the columns of the `Book` table and the record fields,
/// shared by the table reader and the table writer.
pub const BOOK_TABLE_COLUMNS: [(&str, &str); 5] = [
    ("title", "title"),
    ("author", "author"),
    ("isbn", "isbn"),
    ("publisher", "publisher"),
    ("year", "publishedOn"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publisher: String,
    #[serde(rename = "publishedOn")]
    pub published_year: i32,
}

static BOOK_FIELDS: [Field<Book>; 5] = [
    Field {
        name: "title",
        kind: FieldKind::Text,
        get: |book| FieldValue::Text(book.title.clone()),
        set: |book, value| {
            book.title = value.into_text()?;
            Ok(())
        },
    },
    Field {
        name: "author",
        kind: FieldKind::Text,
        get: |book| FieldValue::Text(book.author.clone()),
        set: |book, value| {
            book.author = value.into_text()?;
            Ok(())
        },
    },
    Field {
        name: "isbn",
        kind: FieldKind::Text,
        get: |book| FieldValue::Text(book.isbn.clone()),
        set: |book, value| {
            book.isbn = value.into_text()?;
            Ok(())
        },
    },
    Field {
        name: "publisher",
        kind: FieldKind::Text,
        get: |book| FieldValue::Text(book.publisher.clone()),
        set: |book, value| {
            book.publisher = value.into_text()?;
            Ok(())
        },
    },
    Field {
        name: "publishedOn",
        kind: FieldKind::Integer,
        get: |book| FieldValue::Integer(i64::from(book.published_year)),
        set: |book, value| {
            let year = value.into_integer()?;
            book.published_year = i32::try_from(year)
                .map_err(|_| format!("year {} is out of range", year))?;
            Ok(())
        },
    },
];

impl Record for Book {
    fn fields() -> &'static [Field<Self>] {
        &BOOK_FIELDS
    }
}

/// Keeps the books published in `max_year` or earlier. Every book is logged
/// at info level before the cutoff is applied.
pub fn published_year_filter(max_year: i32) -> FilteringProcessor<Book> {
    FilteringProcessor::new(move |book: &Book| {
        info!("Processing {:?}", book);
        book.published_year <= max_year
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use log::{Level, LevelFilter, Log, Metadata};

    use super::{BOOK_FILE_FIELDS, BOOK_TABLE_COLUMNS, Book, published_year_filter};
    use crate::core::{
        item::ItemProcessor,
        record::{FieldValue, Record, ensure_complete, resolve_fields},
    };

    /// Keeps the info messages logged while the tests run.
    struct CapturingLogger(Mutex<Vec<String>>);

    impl Log for CapturingLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.0.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger(Mutex::new(Vec::new()));

    fn book(year: i32) -> Book {
        Book {
            title: "Neuromancer".to_string(),
            author: "William Gibson".to_string(),
            isbn: "9780441569595".to_string(),
            publisher: "Ace".to_string(),
            published_year: year,
        }
    }

    #[test]
    fn file_and_table_mappings_cover_every_field() {
        let fields = resolve_fields::<Book, _>(&BOOK_FILE_FIELDS).unwrap();
        assert!(ensure_complete(&fields).is_ok());

        let names: Vec<&str> = BOOK_TABLE_COLUMNS.iter().map(|(_, field)| *field).collect();
        let fields = resolve_fields::<Book, _>(&names).unwrap();
        assert!(ensure_complete(&fields).is_ok());
    }

    #[test]
    fn year_out_of_range_is_rejected() {
        let field = Book::field("publishedOn").unwrap();
        let mut book = Book::default();

        assert!((field.set)(&mut book, FieldValue::Integer(i64::MAX)).is_err());
        (field.set)(&mut book, FieldValue::Integer(1984)).unwrap();
        assert_eq!(book.published_year, 1984);
    }

    #[test]
    fn books_after_the_cutoff_are_filtered() {
        let filter = published_year_filter(2019);

        assert_eq!(filter.process(&book(2019)).unwrap(), Some(book(2019)));
        assert_eq!(filter.process(&book(1984)).unwrap(), Some(book(1984)));
        assert_eq!(filter.process(&book(2020)).unwrap(), None);
    }

    #[test]
    fn kept_and_filtered_books_are_both_logged() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Info);

        let filter = published_year_filter(2019);
        for year in [1986, 2030] {
            let count_zero = Book {
                title: "Count Zero".to_string(),
                ..book(year)
            };
            filter.process(&count_zero).unwrap();
        }

        let messages = LOGGER.0.lock().unwrap();
        for year in [1986, 2030] {
            let published = format!("published_year: {}", year);
            assert!(
                messages.iter().any(|message| message.starts_with("Processing Book")
                    && message.contains("Count Zero")
                    && message.contains(&published)),
                "{:?}",
                messages
            );
        }
    }

    #[test]
    fn filtering_twice_gives_the_same_outcome() {
        let filter = published_year_filter(2019);

        for year in [1818, 2019, 2020, 2024] {
            let once = filter.process(&book(year)).unwrap();
            let twice = match &once {
                Some(kept) => filter.process(kept).unwrap(),
                None => None,
            };
            assert_eq!(once, twice);
        }
    }
}
