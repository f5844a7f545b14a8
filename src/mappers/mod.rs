//! Ready-made mappers covering the common record-surgery operations:
//! field selection and renaming, list flattening and unpacking, windowing,
//! value filtering, and nested-path extraction.
//!
//! Each mapper records its constructor arguments into its fingerprint, so
//! two instances built with the same configuration are interchangeable
//! pipeline stages.

pub mod batchers;
pub mod extract;
pub mod fields;
pub mod filters;
pub mod shape;

pub use batchers::FixedBatchSizeMapper;
pub use extract::NestedExtractMapper;
pub use fields::{ChangeFieldsMapper, RenameFieldsMapper};
pub use filters::{FilterOp, ValueFilterMapper};
pub use shape::{ExtraFields, FlattenMapper, UnpackingMapper};
