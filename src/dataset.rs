//! Dataset representations and the backend capability surface.
//!
//! The in-memory shapes a pipeline can execute over are a closed set: a
//! sequence of records or a columnar [`Batch`] (wrapped in a
//! [`crate::view::BatchView`] during execution). Backend-native containers
//! (e.g. an external columnar dataset library) participate through the
//! [`BackendDataset`] trait, which captures the minimal capability set the
//! core needs: column enumeration, a single/batched map with remove-columns
//! support, and column casting.

use crate::error::{PipelineError, PipelineResult, TransformError};
use crate::record::{value_kind, Batch, Record, Value};

/// A type-ish descriptor for a backend column cast, interpreted by the
/// backend.
pub type TypeDescriptor = String;

/// An in-memory dataset in one of the supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// An ordered sequence of records.
    Records(Vec<Record>),
    /// A column-oriented batch.
    Batch(Batch),
}

impl Dataset {
    /// Interpret a JSON value as a dataset.
    ///
    /// An array of objects becomes [`Dataset::Records`]; an object whose
    /// values are equal-length arrays becomes [`Dataset::Batch`]. Anything
    /// else has no dispatch path and is reported as
    /// [`PipelineError::UnsupportedDataset`], naming the offending shape.
    pub fn from_json(value: Value) -> PipelineResult<Self> {
        match value {
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(record) => records.push(record),
                        other => {
                            return Err(PipelineError::UnsupportedDataset {
                                kind: format!("array containing {}", value_kind(&other)),
                            });
                        }
                    }
                }
                Ok(Dataset::Records(records))
            }
            Value::Object(map) => {
                let mut columns = indexmap::IndexMap::new();
                for (name, column) in map {
                    match column {
                        Value::Array(values) => {
                            columns.insert(name, values);
                        }
                        other => {
                            return Err(PipelineError::UnsupportedDataset {
                                kind: format!(
                                    "object with {} value for column '{name}'",
                                    value_kind(&other)
                                ),
                            });
                        }
                    }
                }
                Ok(Dataset::Batch(Batch::from_columns(columns)?))
            }
            other => Err(PipelineError::UnsupportedDataset {
                kind: value_kind(&other).to_string(),
            }),
        }
    }

    /// Number of records/rows.
    pub fn len(&self) -> usize {
        match self {
            Dataset::Records(records) => records.len(),
            Dataset::Batch(batch) => batch.len(),
        }
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a sequence of records regardless of shape.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Dataset::Records(records) => records,
            Dataset::Batch(batch) => batch.into_records(),
        }
    }

    /// Short name of the dataset shape, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Dataset::Records(_) => "records",
            Dataset::Batch(_) => "batch",
        }
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Dataset::Records(records)
    }
}

impl From<Batch> for Dataset {
    fn from(batch: Batch) -> Self {
        Dataset::Batch(batch)
    }
}

/// Options forwarded through a `map` call.
///
/// `num_proc` and `batch_size` are execution hints delegated verbatim to
/// [`BackendDataset`] implementations; the in-memory paths are synchronous
/// and ignore them.
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Whether the transform's output should stand alone instead of being
    /// merged over the input record (single-record mappers on in-memory
    /// paths); on the batch-view path, columns the transform did not
    /// produce are pruned.
    pub remove_columns: bool,
    /// Explicit columns to remove on the backend path. Ignored when the
    /// mapper declares `always_remove_columns`, which removes all original
    /// columns.
    pub remove_column_names: Option<Vec<String>>,
    /// Parallelism hint for backends.
    pub num_proc: Option<usize>,
    /// Chunk-size hint for backends that batch their own map calls.
    pub batch_size: Option<usize>,
}

impl MapOptions {
    /// Options with `remove_columns` enabled.
    pub fn removing_columns() -> Self {
        Self {
            remove_columns: true,
            ..Self::default()
        }
    }
}

/// Minimal capability surface for a backend-native dataset container.
///
/// The core delegates batched/parallel execution to the backend's own map
/// machinery and only defines this contract.
pub trait BackendDataset: Sized {
    /// Enumerate the current column/feature names.
    fn column_names(&self) -> Vec<String>;

    /// Apply `f` once per record.
    ///
    /// Columns named in `remove_columns` are dropped from the result;
    /// fields produced by `f` survive, including ones reusing a dropped
    /// name. Execution hints in `options` are the backend's to interpret.
    fn map_single(
        &self,
        f: &dyn Fn(&Record) -> Result<Record, TransformError>,
        remove_columns: Option<&[String]>,
        options: &MapOptions,
    ) -> PipelineResult<Self>;

    /// Apply `f` once per chunk, with a batch-of-columns argument and
    /// return value. Remove-columns semantics as in
    /// [`BackendDataset::map_single`].
    fn map_batched(
        &self,
        f: &dyn Fn(Batch) -> Result<Batch, TransformError>,
        remove_columns: Option<&[String]>,
        options: &MapOptions,
    ) -> PipelineResult<Self>;

    /// Change the declared type of a column. Backends with no typed schema
    /// may implement this as a no-op.
    fn cast_column(self, name: &str, descriptor: &TypeDescriptor) -> PipelineResult<Self>;
}
