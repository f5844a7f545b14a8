use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by the mapper/pipeline execution layer.
///
/// This is a single error enum shared across all dataset dispatch paths
/// (record lists, columnar batches, backend datasets).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A declared `input_fields`/`output_fields` expectation was not met.
    ///
    /// Not retryable; indicates a misconfigured pipeline (wrong field name or
    /// wrong mapper order).
    #[error("field '{field}' required by mapper {mapper} not found in dataset")]
    MissingField { field: String, mapper: String },

    /// A mapper's own `transform` failed. Propagated unchanged, no retry.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// A dataset shape with no dispatch path.
    #[error("no dispatch path for dataset of kind {kind}")]
    UnsupportedDataset { kind: String },

    /// A row index past the end of a batch.
    #[error("row index {index} out of range for batch of {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    /// Columns of a batch have unequal lengths.
    #[error("ragged batch: column '{column}' has length {found}, expected {expected}")]
    RaggedBatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A backend dataset operation failed.
    #[error("backend dataset error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A mapper constructor argument could not be canonically serialized.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// Failure raised by a mapper's transform function.
///
/// The framework adds no retry and no wrapping beyond
/// [`PipelineError::Transform`]; the original message reaches the caller.
#[derive(Debug, Error)]
#[error("transform failed in mapper {mapper}: {message}")]
pub struct TransformError {
    /// Concrete type name of the failing mapper.
    pub mapper: String,
    /// Human-readable failure description.
    pub message: String,
}

impl TransformError {
    /// Create a new transform error for the named mapper.
    pub fn new(mapper: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            mapper: mapper.into(),
            message: message.into(),
        }
    }
}

/// An argument passed to a mapper constructor could not be serialized for
/// fingerprinting. Fatal at construction time.
#[derive(Debug, Error)]
#[error("cannot fingerprint argument '{argument}' of mapper {mapper}: {message}")]
pub struct FingerprintError {
    /// Mapper (or constructor scope) whose argument failed to serialize.
    pub mapper: String,
    /// Name of the offending argument.
    pub argument: String,
    /// Underlying serialization failure.
    pub message: String,
}

/// Error type for the nested path engine.
#[derive(Debug, Error)]
pub enum NestedError {
    /// The path string failed to parse. Raised at construction time, before
    /// any data is touched.
    #[error("could not parse path '{key}' at byte {position}: {message}")]
    Parse {
        key: String,
        position: usize,
        message: String,
    },

    /// Traversal reached a value of the wrong container kind.
    #[error("expected {expected} at fragment '{fragment}', found {found}")]
    WrongContainer {
        expected: &'static str,
        found: &'static str,
        fragment: String,
    },

    /// A dictionary key named by the path is absent.
    #[error("key '{key}' not found")]
    KeyNotFound { key: String },

    /// A list index named by the path is out of range.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_mapper_and_field() {
        let err = PipelineError::MissingField {
            field: "tokens".to_string(),
            mapper: "TruncateMapper".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'tokens'"));
        assert!(msg.contains("TruncateMapper"));
    }

    #[test]
    fn transform_error_is_transparent() {
        let err: PipelineError = TransformError::new("FlattenMapper", "field is not a list").into();
        assert_eq!(
            err.to_string(),
            "transform failed in mapper FlattenMapper: field is not a list"
        );
    }

    #[test]
    fn fingerprint_error_names_argument() {
        let err = FingerprintError {
            mapper: "ValueFilterMapper".to_string(),
            argument: "threshold".to_string(),
            message: "key must be a string".to_string(),
        };
        assert!(err.to_string().contains("'threshold'"));
        assert!(err.to_string().contains("ValueFilterMapper"));
    }
}
