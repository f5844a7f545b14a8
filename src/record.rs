//! Core data model types: records and columnar batches.
//!
//! A [`Record`] is an insertion-ordered mapping from field name to [`Value`].
//! A [`Batch`] is the column-oriented dual: a mapping from field name to a
//! column of values, all columns equally long, with an implicit row index
//! addressing "virtual records". [`Batch::from_records`] and
//! [`Batch::into_records`] convert between the two shapes and are the
//! reshaping primitive used by the batched dispatch paths.

use indexmap::IndexMap;

use crate::error::{PipelineError, PipelineResult};

pub use serde_json::Value;

/// A single record: field name to value, insertion-ordered.
pub type Record = serde_json::Map<String, Value>;

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A column-oriented batch of records.
///
/// Invariant: every column has the same length, equal to [`Batch::len`].
/// Constructors reject ragged input with [`PipelineError::RaggedBatch`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    columns: IndexMap<String, Vec<Value>>,
    rows: usize,
}

impl Batch {
    /// Create an empty batch with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch from named columns, verifying equal lengths.
    pub fn from_columns(columns: IndexMap<String, Vec<Value>>) -> PipelineResult<Self> {
        let rows = columns.values().next().map(Vec::len).unwrap_or(0);
        for (name, column) in &columns {
            if column.len() != rows {
                return Err(PipelineError::RaggedBatch {
                    column: name.clone(),
                    expected: rows,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a batch by accumulating records column-wise.
    ///
    /// Column order is first-seen field order. Records may carry
    /// heterogeneous field sets: a column appearing mid-stream is
    /// back-filled with [`Value::Null`] for earlier rows, and a record
    /// missing a known column contributes a null cell, so the result is
    /// always rectangular.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut rows = 0usize;
        for record in records {
            for (name, value) in record {
                columns
                    .entry(name)
                    .or_insert_with(|| vec![Value::Null; rows])
                    .push(value);
            }
            rows += 1;
            for column in columns.values_mut() {
                if column.len() < rows {
                    column.push(Value::Null);
                }
            }
        }
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Whether a column with the given name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Borrow a column by name.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Borrow a column mutably by name.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.columns.get_mut(name)
    }

    /// Insert a column. Fails with [`PipelineError::RaggedBatch`] if the
    /// length disagrees with existing columns. The first column inserted
    /// into an empty batch fixes the row count.
    pub fn insert_column(&mut self, name: impl Into<String>, column: Vec<Value>) -> PipelineResult<()> {
        let name = name.into();
        if self.columns.is_empty() {
            self.rows = column.len();
        } else if column.len() != self.rows {
            return Err(PipelineError::RaggedBatch {
                expected: self.rows,
                found: column.len(),
                column: name,
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Remove and return a column, preserving the order of the rest.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Value>> {
        self.columns.shift_remove(name)
    }

    /// Materialize the row at `idx` as an owned [`Record`].
    pub fn record(&self, idx: usize) -> Option<Record> {
        if idx >= self.rows {
            return None;
        }
        let mut record = Record::new();
        for (name, column) in &self.columns {
            record.insert(name.clone(), column[idx].clone());
        }
        Some(record)
    }

    /// Consume the batch into a row-ordered list of records.
    ///
    /// Field order within each record matches the batch's column order.
    pub fn into_records(self) -> Vec<Record> {
        let mut records = vec![Record::new(); self.rows];
        for (name, column) in self.columns {
            for (record, value) in records.iter_mut().zip(column) {
                record.insert(name.clone(), value);
            }
        }
        records
    }

    /// Clone the batch into a row-ordered list of records.
    pub fn to_records(&self) -> Vec<Record> {
        self.clone().into_records()
    }
}
