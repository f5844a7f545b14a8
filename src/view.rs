//! Record-batch view: row-wise access over a columnar [`Batch`].
//!
//! [`BatchView`] adapts a column-oriented batch into a sequence of per-row
//! views so that single-record transforms can run unmodified against
//! columnar data. Reads are zero-copy borrows into the underlying columns;
//! writes go through [`BatchView::write_row`] and mutate the columns in
//! place. The view is unsynchronized: callers needing parallel execution
//! must partition data across independent batches instead of sharing one
//! view.

use crate::error::{PipelineError, PipelineResult};
use crate::record::{Batch, Record, Value};

/// A mutable, index-addressable view over a [`Batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchView {
    batch: Batch,
}

impl BatchView {
    /// Wrap a batch. Equal column lengths are already guaranteed by the
    /// [`Batch`] constructors.
    pub fn new(batch: Batch) -> Self {
        Self { batch }
    }

    /// Number of rows in the view.
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Whether the view has no rows.
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.batch.column_names()
    }

    /// Read-only view of the row at `idx`.
    pub fn row(&self, idx: usize) -> Option<RowView<'_>> {
        (idx < self.batch.len()).then_some(RowView { batch: &self.batch, idx })
    }

    /// Iterate read-only row views in order.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.batch.len()).map(|idx| RowView { batch: &self.batch, idx })
    }

    /// Write a record into the row at `idx`, field by field.
    ///
    /// Fields naming existing columns overwrite the cell at that row; a
    /// field naming an unknown column creates it, back-filled with
    /// [`Value::Null`] for the other rows.
    pub fn write_row(&mut self, idx: usize, record: &Record) -> PipelineResult<()> {
        for (name, value) in record {
            self.set(idx, name, value.clone())?;
        }
        Ok(())
    }

    /// Set one cell, creating the column if needed. Fails on a row index
    /// past the end of the batch.
    pub fn set(&mut self, idx: usize, name: &str, value: Value) -> PipelineResult<()> {
        if idx >= self.batch.len() {
            return Err(PipelineError::RowOutOfRange {
                index: idx,
                len: self.batch.len(),
            });
        }
        match self.batch.column_mut(name) {
            Some(column) => column[idx] = value,
            None => {
                let mut column = vec![Value::Null; self.batch.len()];
                column[idx] = value;
                self.batch.insert_column(name, column)?;
            }
        }
        Ok(())
    }

    /// Drop an entire column, returning its values.
    pub fn pop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        self.batch.remove_column(name)
    }

    /// Apply a whole-batch transformation and re-wrap the result.
    pub fn map<E>(self, f: impl FnOnce(Batch) -> Result<Batch, E>) -> Result<Self, E> {
        Ok(Self::new(f(self.batch)?))
    }

    /// Unwrap the underlying batch.
    pub fn into_inner(self) -> Batch {
        self.batch
    }
}

/// A read-only view of one row of a [`BatchView`].
///
/// Reads borrow directly from the per-column storage; nothing is copied
/// until [`RowView::to_record`] is called.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'b> {
    batch: &'b Batch,
    idx: usize,
}

impl<'b> RowView<'b> {
    /// Row index within the batch.
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.batch.column_count()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.batch.column_count() == 0
    }

    /// Borrow the value of one field.
    pub fn get(&self, name: &str) -> Option<&'b Value> {
        self.batch.column(name).map(|column| &column[self.idx])
    }

    /// Iterate field names in column order.
    pub fn keys(&self) -> impl Iterator<Item = &'b str> + use<'b> {
        let batch = self.batch;
        batch.column_names()
    }

    /// Iterate values in column order.
    pub fn values(&self) -> impl Iterator<Item = &'b Value> + use<'b> {
        let batch = self.batch;
        let idx = self.idx;
        batch
            .column_names()
            .filter_map(move |name| batch.column(name).map(|column| &column[idx]))
    }

    /// Iterate `(field, value)` pairs in column order.
    pub fn items(&self) -> impl Iterator<Item = (&'b str, &'b Value)> + use<'b> {
        self.keys().zip(self.values())
    }

    /// Materialize the row as an owned [`Record`].
    pub fn to_record(&self) -> Record {
        // idx is validated at construction
        self.batch.record(self.idx).unwrap_or_default()
    }
}
