//! `recordpipe` is a small library for composing record transformations
//! into reusable, fingerprinted pipelines over in-memory datasets.
//!
//! Data is JSON-shaped: a [`record::Record`] is an ordered map of field
//! name to [`record::Value`], and a dataset is either a sequence of
//! records or a columnar [`record::Batch`]. A [`mapper::Mapper`] declares
//! the fields it expects and produces, carries a content-stable
//! [`fingerprint::Fingerprint`] of its configuration, and implements
//! either a per-record or a batched (possibly fan-out/fan-in) transform.
//! Mappers chain into a [`pipeline::Pipeline`] with `>>`/`<<` or
//! [`pipeline::MapperExt::chain`], and the pipeline runs over any
//! supported dataset shape, including backend-native containers through
//! [`dataset::BackendDataset`].
//!
//! ## Quick example: build and run a pipeline
//!
//! ```
//! use recordpipe::dataset::{Dataset, MapOptions};
//! use recordpipe::mappers::{ChangeFieldsMapper, RenameFieldsMapper};
//! use recordpipe::pipeline::MapperExt;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = RenameFieldsMapper::new([("txt", "text")], false)?
//!     .chain(ChangeFieldsMapper::keep(["text"])?);
//!
//! let data = Dataset::from_json(json!([
//!     {"txt": "hello", "id": 1},
//!     {"txt": "world", "id": 2},
//! ]))?;
//! let out = pipeline.map(data, &MapOptions::default())?;
//! assert_eq!(
//!     out.into_records()[0],
//!     *json!({"text": "hello"}).as_object().unwrap(),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Batched mappers may change the number of records; here one record fans
//! out per list element and a filter fans back in:
//!
//! ```
//! use recordpipe::dataset::MapOptions;
//! use recordpipe::mappers::{ExtraFields, FilterOp, UnpackingMapper, ValueFilterMapper};
//! use recordpipe::pipeline::MapperExt;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = UnpackingMapper::unpack(["score"], ExtraFields::Repeat)?
//!     .chain(ValueFilterMapper::new("score", FilterOp::Ge, json!(5))?);
//!
//! let records = vec![json!({"score": [3, 7], "run": "a"}).as_object().unwrap().clone()];
//! let out = pipeline.map_records(records, &MapOptions::default())?;
//! assert_eq!(out, vec![json!({"score": 7, "run": "a"}).as_object().unwrap().clone()]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`]: the record and columnar batch data model
//! - [`dataset`]: dataset shapes, map options, and the backend trait
//! - [`mapper`]: the mapper contract (transforms, field contracts, cores)
//! - [`pipeline`]: composition operators and pipeline execution
//! - [`fingerprint`]: content-stable configuration fingerprints
//! - [`nested`]: the nested path engine for deep JSON access
//! - [`mappers`]: ready-made field, shape, windowing, filter, and
//!   extraction mappers
//! - [`view`]: row-wise mutable views over columnar batches
//! - [`error`]: error types used across the crate
//!
//! Pipelines and their fingerprints are deterministic: two pipelines built
//! from mappers with the same configuration are equal (`==`) and share a
//! fingerprint, which makes the fingerprint usable as a cache key for
//! transformed datasets.

pub mod dataset;
mod dispatch;
pub mod error;
pub mod fingerprint;
pub mod mapper;
pub mod mappers;
pub mod nested;
pub mod pipeline;
pub mod record;
pub mod view;

pub use error::{FingerprintError, NestedError, PipelineError, PipelineResult, TransformError};
