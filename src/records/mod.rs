//! Record Set Module
//!
//! Parses a source document into an ordered set of JSON records, selects the
//! records with a given status, and serializes the selection back to a JSON
//! array. Field order of every record is kept exactly as it appears in the
//! input.
//!

mod flatten;

use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub use flatten::flatten_record;

/// Field inspected by the filter
pub const STATUS_FIELD: &str = "status";
/// Status value that is kept
pub const DELIVERED_STATUS: &str = "delivered";

pub type Record = serde_json::Map<String, JsonValue>;

/// How a parsed document is turned into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Array of objects, or an object of equally sized column arrays.
    /// Nested values are kept as they are.
    Tabular,
    /// Array of objects, or a single object. Nested objects are flattened
    /// into dotted keys.
    Flatten,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to decompress: {0}")]
    Decompression(String),

    #[error("Invalid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Document is not tabular: {0}")]
    NotTabular(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse raw document bytes into a record set
    pub fn parse(data: &[u8], normalization: Normalization) -> Result<Self, RecordError> {
        let content = std::str::from_utf8(data)?;
        let value: JsonValue = serde_json::from_str(content)?;

        let records = match normalization {
            Normalization::Tabular => tabular_rows(value)?,
            Normalization::Flatten => flatten_rows(value)?,
        };

        Ok(Self { records })
    }

    /// Keep only records whose `field` is a string equal to `value`.
    /// Relative order of the kept records is unchanged.
    pub fn retain_status(&mut self, field: &str, value: &str) {
        self.records
            .retain(|record| matches!(record.get(field), Some(JsonValue::String(s)) if s == value));
    }

    /// Serialize as a compact JSON array of objects
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec(&self.records)?)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Decompress data if the key's extension indicates gzip
pub fn decompress_if_needed(data: Vec<u8>, key: &str) -> Result<Vec<u8>, RecordError> {
    if key.ends_with(".gz") || key.ends_with(".gzip") {
        let mut decoder = GzDecoder::new(data.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).map_err(|e| {
            RecordError::Decompression(format!("invalid gzip data: {}", e))
        })?;
        Ok(decompressed)
    } else {
        Ok(data)
    }
}

fn object_rows(items: Vec<JsonValue>) -> Result<Vec<Record>, RecordError> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            JsonValue::Object(map) => Ok(map),
            other => Err(RecordError::NotTabular(format!(
                "element {} is {}, expected an object",
                idx,
                kind(&other)
            ))),
        })
        .collect()
}

fn tabular_rows(value: JsonValue) -> Result<Vec<Record>, RecordError> {
    match value {
        JsonValue::Array(items) => object_rows(items),
        JsonValue::Object(columns) => column_rows(columns),
        other => Err(RecordError::NotTabular(format!(
            "top level is {}, expected an array or object",
            kind(&other)
        ))),
    }
}

/// Turn `{"a": [..], "b": [..]}` into one row per index
fn column_rows(columns: Record) -> Result<Vec<Record>, RecordError> {
    let mut row_count = None;
    let mut arrays = Vec::with_capacity(columns.len());

    for (name, column) in columns {
        let values = match column {
            JsonValue::Array(values) => values,
            other => {
                return Err(RecordError::NotTabular(format!(
                    "column '{}' is {}, expected an array",
                    name,
                    kind(&other)
                )));
            }
        };

        match row_count {
            None => row_count = Some(values.len()),
            Some(n) if n != values.len() => {
                return Err(RecordError::NotTabular(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    n
                )));
            }
            Some(_) => {}
        }

        arrays.push((name, values.into_iter()));
    }

    let mut rows = Vec::with_capacity(row_count.unwrap_or(0));
    for _ in 0..row_count.unwrap_or(0) {
        let mut row = Record::new();
        for (name, values) in arrays.iter_mut() {
            if let Some(value) = values.next() {
                row.insert(name.clone(), value);
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

fn flatten_rows(value: JsonValue) -> Result<Vec<Record>, RecordError> {
    let rows = match value {
        JsonValue::Array(items) => object_rows(items)?,
        JsonValue::Object(map) => vec![map],
        other => {
            return Err(RecordError::NotTabular(format!(
                "top level is {}, expected an array or object",
                kind(&other)
            )));
        }
    };

    rows.into_iter().map(flatten_record).collect()
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
