//! Batched fan-in: dropping records that fail a comparison.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{FingerprintError, TransformError};
use crate::fingerprint::FingerprintBuilder;
use crate::mapper::{
    BatchedTransform, FieldContract, Mapper, MapperCore, RecordIter, Transform, TransformedIter,
};
use crate::record::{value_kind, Record, Value};

/// Comparison applied between a record's field and the reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Keeps only the records whose field satisfies a comparison against a
/// fixed reference value.
///
/// Equality works on any value kind; the ordered comparisons require both
/// sides to be numbers or both to be strings, and fail the batch
/// otherwise.
#[derive(Debug)]
pub struct ValueFilterMapper {
    core: MapperCore,
    field: String,
    op: FilterOp,
    reference: Value,
}

impl ValueFilterMapper {
    pub fn new(
        field: impl Into<String>,
        op: FilterOp,
        reference: Value,
    ) -> Result<Self, FingerprintError> {
        let field = field.into();
        let contract = FieldContract::new([field.clone()], [field.clone()]);
        let builder = FingerprintBuilder::new("ValueFilterMapper")
            .arg("field", &field)?
            .arg("op", &op)?
            .arg("reference", &reference)?;
        let core = MapperCore::new("ValueFilterMapper", contract, builder)?;
        Ok(Self {
            core,
            field,
            op,
            reference,
        })
    }

    fn keeps(&self, record: &Record) -> Result<bool, TransformError> {
        let value = record.get(&self.field).ok_or_else(|| {
            TransformError::new(
                self.core.name(),
                format!("field '{}' not found", self.field),
            )
        })?;
        match self.op {
            FilterOp::Eq => Ok(value == &self.reference),
            FilterOp::Ne => Ok(value != &self.reference),
            FilterOp::Lt => Ok(self.ordering(value)?.is_lt()),
            FilterOp::Le => Ok(self.ordering(value)?.is_le()),
            FilterOp::Gt => Ok(self.ordering(value)?.is_gt()),
            FilterOp::Ge => Ok(self.ordering(value)?.is_ge()),
        }
    }

    fn ordering(&self, value: &Value) -> Result<Ordering, TransformError> {
        compare(value, &self.reference).ok_or_else(|| {
            TransformError::new(
                self.core.name(),
                format!(
                    "cannot order {} against {} in field '{}'",
                    value_kind(value),
                    value_kind(&self.reference),
                    self.field
                ),
            )
        })
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        // integers compare exactly; f64 only when one side already is one,
        // since the f64 round-trip loses precision past 2^53
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            },
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl BatchedTransform for ValueFilterMapper {
    fn transform_batch<'a>(&'a self, records: RecordIter<'a>) -> TransformedIter<'a> {
        Box::new(records.filter_map(move |record| match self.keeps(&record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }))
    }
}

impl Mapper for ValueFilterMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Batched(self)
    }
}
