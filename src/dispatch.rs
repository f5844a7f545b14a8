//! Per-representation execution strategies for one mapper stage.
//!
//! Each function runs a single mapper over one dataset shape, enforcing the
//! mapper's field contract before and after the transform. The pipeline
//! driver ([`crate::pipeline::Pipeline::map`]) feeds each stage's output to
//! the next; nothing here recurses.
//!
//! Remove-columns semantics are uniform across paths: the transform's
//! output is authoritative. Single-record mappers merge their output over
//! the input record (new values win) unless remove-columns is on, in which
//! case the output stands alone; batched mappers' outputs are taken as
//! returned in both cases, since merging is undefined when the transform
//! changes cardinality.

use std::collections::HashSet;

use log::trace;

use crate::dataset::{BackendDataset, MapOptions};
use crate::error::{PipelineError, PipelineResult, TransformError};
use crate::mapper::{BatchedTransform, Mapper, Transform};
use crate::record::{Batch, Record};
use crate::view::BatchView;

/// Run one mapper stage over a sequence of records.
pub(crate) fn map_records(
    mapper: &dyn Mapper,
    records: Vec<Record>,
    options: &MapOptions,
) -> PipelineResult<Vec<Record>> {
    let contract = mapper.core().contract();
    if let Some(first) = records.first() {
        contract.check_input(first.keys().map(String::as_str), mapper.name())?;
    }
    trace!("mapper {} over {} records", mapper.name(), records.len());

    let remove = options.remove_columns || mapper.always_remove_columns();
    let transformed = match mapper.transform() {
        Transform::Single(t) => {
            let mut out = Vec::with_capacity(records.len());
            for record in &records {
                let produced = t.transform(record)?;
                out.push(if remove { produced } else { merged(record, produced) });
            }
            out
        }
        Transform::Batched(t) => t
            .transform_batch(Box::new(records.into_iter()))
            .collect::<Result<Vec<_>, TransformError>>()?,
    };

    if let Some(first) = transformed.first() {
        contract.check_output(first.keys().map(String::as_str), mapper.name())?;
    }
    Ok(transformed)
}

/// Run one mapper stage over a columnar batch, mutating it through a
/// [`BatchView`].
pub(crate) fn map_batch(
    mapper: &dyn Mapper,
    batch: Batch,
    options: &MapOptions,
) -> PipelineResult<Batch> {
    let contract = mapper.core().contract();
    contract.check_input(batch.column_names(), mapper.name())?;
    trace!("mapper {} over batch of {} rows", mapper.name(), batch.len());

    let removing = options.remove_columns || mapper.always_remove_columns();
    let mut view = BatchView::new(batch);
    match mapper.transform() {
        Transform::Batched(t) => {
            // the transformed batch replaces the input wholesale, so there
            // is nothing left to prune
            view = view.map(|b| batch_transform(t, b).map_err(PipelineError::from))?;
        }
        Transform::Single(t) => {
            // materialize inputs up front: writes for earlier rows must not
            // leak new columns into later rows' input records
            let inputs: Vec<Record> = view.rows().map(|row| row.to_record()).collect();
            let mut produced_columns: HashSet<String> = HashSet::new();
            for (idx, record) in inputs.iter().enumerate() {
                let produced = t.transform(record)?;
                if removing {
                    produced_columns.extend(produced.keys().cloned());
                }
                view.write_row(idx, &produced)?;
            }
            if removing && !view.is_empty() {
                let prune: Vec<String> = view
                    .column_names()
                    .filter(|name| !produced_columns.contains(*name))
                    .map(str::to_string)
                    .collect();
                for name in prune {
                    view.pop_column(&name);
                }
            }
        }
    }

    contract.check_output(view.column_names(), mapper.name())?;
    Ok(view.into_inner())
}

/// Run one mapper stage over a backend-native dataset, delegating execution
/// to the backend's own map machinery.
pub(crate) fn map_backend<B: BackendDataset>(
    mapper: &dyn Mapper,
    dataset: B,
    options: &MapOptions,
) -> PipelineResult<B> {
    let contract = mapper.core().contract();
    let columns = dataset.column_names();
    contract.check_input(columns.iter().map(String::as_str), mapper.name())?;
    trace!("mapper {} over backend dataset", mapper.name());

    let remove: Option<Vec<String>> = if mapper.always_remove_columns() {
        Some(columns)
    } else {
        options.remove_column_names.clone()
    };

    let mut mapped = match mapper.transform() {
        Transform::Single(t) => {
            dataset.map_single(&|record| t.transform(record), remove.as_deref(), options)?
        }
        Transform::Batched(t) => {
            dataset.map_batched(&|batch| batch_transform(t, batch), remove.as_deref(), options)?
        }
    };

    for (column, descriptor) in mapper.cast_columns() {
        mapped = mapped.cast_column(&column, &descriptor)?;
    }

    let out_columns = mapped.column_names();
    contract.check_output(out_columns.iter().map(String::as_str), mapper.name())?;
    Ok(mapped)
}

/// Shared batched reshaping: unroll a batch of columns into records, run
/// the batched transform, and re-accumulate the output column-wise.
///
/// Column order is captured once by the unrolling and re-established by
/// first-seen field order on the way back; late-appearing output columns
/// are tolerated (see [`Batch::from_records`]).
pub(crate) fn batch_transform(
    t: &dyn BatchedTransform,
    batch: Batch,
) -> Result<Batch, TransformError> {
    let records = batch.into_records();
    let transformed: Vec<Record> = t
        .transform_batch(Box::new(records.into_iter()))
        .collect::<Result<_, _>>()?;
    Ok(Batch::from_records(transformed))
}

/// Shallow merge of a transform's output over the input record; values
/// produced by the transform win on conflict.
fn merged(original: &Record, produced: Record) -> Record {
    let mut out = original.clone();
    for (key, value) in produced {
        out.insert(key, value);
    }
    out
}
