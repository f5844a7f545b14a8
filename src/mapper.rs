//! The mapper contract: field contracts, the transform variants, and the
//! object-safe [`Mapper`] trait.
//!
//! A mapper is a unit of transformation with declared input/output field
//! contracts and a stable fingerprint. Mapper authors implement exactly one
//! of the two transform variants -- [`SingleTransform`] for pure per-record
//! functions, [`BatchedTransform`] for lazy, possibly-reshaping sequence
//! transforms -- and expose it through [`Mapper::transform`]. The shared
//! bookkeeping (name, contract, fingerprint) lives in a [`MapperCore`] that
//! concrete mappers embed.

use std::collections::HashSet;
use std::fmt;

use crate::error::{FingerprintError, PipelineError, PipelineResult, TransformError};
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::record::Record;

/// An owned iterator of records fed to a batched transform.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Record> + 'a>;

/// The lazy output of a batched transform. A mid-stream error aborts the
/// current batch.
pub type TransformedIter<'a> = Box<dyn Iterator<Item = Result<Record, TransformError>> + 'a>;

/// A pure single-record transform.
pub trait SingleTransform {
    /// Transform one record. May add, rename, or remove keys freely; must
    /// not depend on sibling records.
    fn transform(&self, record: &Record) -> Result<Record, TransformError>;
}

/// A batched transform over a lazy sequence of records.
///
/// The transform may consume the whole input before yielding (windowing) or
/// yield incrementally, and may change cardinality (fan-out/fan-in).
/// Consumption order is the only guarantee; nothing is materialized eagerly
/// on its behalf.
pub trait BatchedTransform {
    fn transform_batch<'a>(&'a self, records: RecordIter<'a>) -> TransformedIter<'a>;
}

/// The transform variant a mapper implements.
pub enum Transform<'m> {
    /// Per-record transform; batching is irrelevant to this form.
    Single(&'m dyn SingleTransform),
    /// Sequence transform; may reshape the batch.
    Batched(&'m dyn BatchedTransform),
}

/// Declared input/output field expectations of a mapper.
///
/// An empty list is an explicit opt-out of the corresponding check, not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldContract {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
}

impl FieldContract {
    /// Declare expected input fields and guaranteed output fields.
    pub fn new(
        input_fields: impl IntoIterator<Item = impl Into<String>>,
        output_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            input_fields: input_fields.into_iter().map(Into::into).collect(),
            output_fields: output_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// A contract with both checks disabled.
    pub fn unchecked() -> Self {
        Self::default()
    }

    /// Fields this mapper expects to find in its input.
    pub fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    /// Fields this mapper guarantees in its output.
    pub fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    /// Verify every declared input field is present among `provided`.
    pub fn check_input<'a>(
        &self,
        provided: impl IntoIterator<Item = &'a str>,
        mapper: &str,
    ) -> PipelineResult<()> {
        Self::check(&self.input_fields, provided, mapper)
    }

    /// Verify every declared output field is present among `provided`.
    pub fn check_output<'a>(
        &self,
        provided: impl IntoIterator<Item = &'a str>,
        mapper: &str,
    ) -> PipelineResult<()> {
        Self::check(&self.output_fields, provided, mapper)
    }

    fn check<'a>(
        expected: &[String],
        provided: impl IntoIterator<Item = &'a str>,
        mapper: &str,
    ) -> PipelineResult<()> {
        if expected.is_empty() {
            return Ok(());
        }
        let provided: HashSet<&str> = provided.into_iter().collect();
        for field in expected {
            if !provided.contains(field.as_str()) {
                return Err(PipelineError::MissingField {
                    field: field.clone(),
                    mapper: mapper.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Shared mapper state: concrete type name, field contract, fingerprint.
///
/// Concrete mappers embed a core and hand it their [`FingerprintBuilder`]
/// with their own constructor arguments already recorded; the core appends
/// the contract fields under its own scope and finalizes the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperCore {
    name: String,
    contract: FieldContract,
    fingerprint: Fingerprint,
}

impl MapperCore {
    /// Finalize a mapper's identity from its contract and the argument
    /// builder its constructor filled in.
    pub fn new(
        name: impl Into<String>,
        contract: FieldContract,
        builder: FingerprintBuilder,
    ) -> Result<Self, FingerprintError> {
        let fingerprint = builder
            .scope("MapperCore")
            .arg("input_fields", &contract.input_fields)?
            .arg("output_fields", &contract.output_fields)?
            .finish();
        Ok(Self {
            name: name.into(),
            contract,
            fingerprint,
        })
    }

    /// Rehydrate a core with a fingerprint computed earlier; the
    /// fingerprint is not recomputed.
    pub fn with_fingerprint(
        name: impl Into<String>,
        contract: FieldContract,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            name: name.into(),
            contract,
            fingerprint,
        }
    }

    /// Concrete mapper type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapper's field contract.
    pub fn contract(&self) -> &FieldContract {
        &self.contract
    }

    /// The mapper's stable fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Object-safe mapper interface used by the dispatch layer and pipelines.
pub trait Mapper: fmt::Debug + Send + Sync {
    /// Shared identity and contract state.
    fn core(&self) -> &MapperCore;

    /// The transform variant this mapper implements.
    fn transform(&self) -> Transform<'_>;

    /// Whether this mapper always strips the input columns from the result,
    /// regardless of the caller's remove-columns option.
    fn always_remove_columns(&self) -> bool {
        false
    }

    /// Column type changes to apply on backend datasets after
    /// transformation. Rarely used; defaults to none.
    fn cast_columns(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Concrete type name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Declared input fields.
    fn input_fields(&self) -> &[String] {
        self.core().contract().input_fields()
    }

    /// Declared output fields.
    fn output_fields(&self) -> &[String] {
        self.core().contract().output_fields()
    }

    /// Construction-time fingerprint.
    fn fingerprint(&self) -> &Fingerprint {
        self.core().fingerprint()
    }
}

/// Mapper equality: same concrete type name and equal fingerprint.
pub fn mapper_eq(a: &dyn Mapper, b: &dyn Mapper) -> bool {
    a.name() == b.name() && a.fingerprint() == b.fingerprint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn core(name: &str, contract: FieldContract) -> MapperCore {
        MapperCore::new(name, contract, FingerprintBuilder::new(name)).unwrap()
    }

    #[derive(Debug)]
    struct AddOne {
        core: MapperCore,
    }

    impl SingleTransform for AddOne {
        fn transform(&self, record: &Record) -> Result<Record, TransformError> {
            let mut out = record.clone();
            for value in out.values_mut() {
                if let Some(n) = value.as_i64() {
                    *value = json!(n + 1);
                }
            }
            Ok(out)
        }
    }

    impl Mapper for AddOne {
        fn core(&self) -> &MapperCore {
            &self.core
        }

        fn transform(&self) -> Transform<'_> {
            Transform::Single(self)
        }
    }

    #[test]
    fn contract_check_passes_with_extra_fields() {
        let contract = FieldContract::new(["x"], Vec::<String>::new());
        assert!(contract.check_input(["x", "y", "z"], "M").is_ok());
    }

    #[test]
    fn contract_check_fails_on_missing_field() {
        let contract = FieldContract::new(["x"], Vec::<String>::new());
        let err = contract.check_input(["y"], "M").unwrap_err();
        match err {
            PipelineError::MissingField { field, mapper } => {
                assert_eq!(field, "x");
                assert_eq!(mapper, "M");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_contract_is_an_opt_out() {
        let contract = FieldContract::unchecked();
        assert!(contract.check_input(std::iter::empty(), "M").is_ok());
        assert!(contract.check_output(std::iter::empty(), "M").is_ok());
    }

    #[test]
    fn core_fingerprint_covers_the_contract() {
        let a = core("M", FieldContract::new(["x"], ["y"]));
        let b = core("M", FieldContract::new(["x"], ["z"]));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn rehydrated_core_keeps_its_fingerprint() {
        let original = core("M", FieldContract::unchecked());
        let rehydrated = MapperCore::with_fingerprint(
            "M",
            FieldContract::unchecked(),
            original.fingerprint().clone(),
        );
        assert_eq!(original.fingerprint(), rehydrated.fingerprint());
    }

    #[test]
    fn mapper_equality_is_name_plus_fingerprint() {
        let a = AddOne { core: core("AddOne", FieldContract::unchecked()) };
        let b = AddOne { core: core("AddOne", FieldContract::unchecked()) };
        let c = AddOne { core: core("AddTwo", FieldContract::unchecked()) };
        assert!(mapper_eq(&a, &b));
        assert!(!mapper_eq(&a, &c));
    }

    #[test]
    fn single_transform_runs_through_the_trait_object() {
        let mapper = AddOne { core: core("AddOne", FieldContract::unchecked()) };
        let record = json!({"a": 1}).as_object().unwrap().clone();
        match Mapper::transform(&mapper) {
            Transform::Single(t) => {
                let out = t.transform(&record).unwrap();
                assert_eq!(out["a"], json!(2));
            }
            Transform::Batched(_) => panic!("expected a single transform"),
        }
    }
}
