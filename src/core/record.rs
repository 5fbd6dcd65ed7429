use std::fmt::{self, Debug, Display};

use crate::error::BatchError;

/// Kind of value a [`Field`] holds, used to parse and decode external data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

impl FieldKind {
    /// Parses a raw textual value (e.g. one column of a delimited line).
    pub fn parse(self, raw: &str) -> Result<FieldValue, String> {
        match self {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|error| format!("'{}' is not an integer: {}", raw, error)),
        }
    }
}

/// A single field value moving between a record and an external format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn into_text(self) -> Result<String, String> {
        match self {
            FieldValue::Text(text) => Ok(text),
            FieldValue::Integer(value) => Err(format!("expected text, found integer {}", value)),
        }
    }

    pub fn into_integer(self) -> Result<i64, String> {
        match self {
            FieldValue::Integer(value) => Ok(value),
            FieldValue::Text(text) => Err(format!("expected integer, found text '{}'", text)),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// Statically declared accessor pair for one named field of a record.
pub struct Field<T> {
    /// External name used by readers and writers to refer to the field.
    pub name: &'static str,
    pub kind: FieldKind,
    pub get: fn(&T) -> FieldValue,
    pub set: fn(&mut T, FieldValue) -> Result<(), String>,
}

/// A record type with a fixed schema.
///
/// Readers and writers never inspect a record any other way than through
/// [`Record::fields`]. Names are resolved once, when a component is built, so
/// an unknown name is a configuration error rather than a per-record failure.
pub trait Record: Default + Clone + Debug + 'static {
    fn fields() -> &'static [Field<Self>];

    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|field| field.name == name)
    }
}

/// Resolves an ordered list of field names against the schema of `T`.
///
/// Fails on unknown or duplicated names.
pub fn resolve_fields<T: Record, S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<&'static Field<T>>, BatchError> {
    let mut fields: Vec<&'static Field<T>> = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        let field = T::field(name).ok_or_else(|| {
            BatchError::Configuration(format!(
                "unknown field '{}', expected one of [{}]",
                name,
                field_names::<T>().join(", ")
            ))
        })?;

        if fields.iter().any(|resolved| resolved.name == field.name) {
            return Err(BatchError::Configuration(format!(
                "field '{}' is mapped more than once",
                name
            )));
        }

        fields.push(field);
    }

    Ok(fields)
}

/// Ensures a resolved mapping covers every field of `T`, so that a reader
/// built from it never produces a partial record.
pub fn ensure_complete<T: Record>(fields: &[&'static Field<T>]) -> Result<(), BatchError> {
    let missing: Vec<&str> = T::fields()
        .iter()
        .filter(|field| !fields.iter().any(|mapped| mapped.name == field.name))
        .map(|field| field.name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BatchError::Configuration(format!(
            "mapping does not cover fields [{}]",
            missing.join(", ")
        )))
    }
}

fn field_names<T: Record>() -> Vec<&'static str> {
    T::fields().iter().map(|field| field.name).collect()
}
