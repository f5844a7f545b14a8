//! Mappers that change the shape of values or of the record stream itself.

use serde::Serialize;

use crate::error::{FingerprintError, TransformError};
use crate::fingerprint::FingerprintBuilder;
use crate::mapper::{
    BatchedTransform, FieldContract, Mapper, MapperCore, RecordIter, SingleTransform, Transform,
    TransformedIter,
};
use crate::record::{Record, Value};

/// Flattens arbitrarily nested lists in the named fields down to a single
/// list.
///
/// Nesting depth is probed on the first element: as long as it is a list,
/// one level is flattened, so `[[1, 2], [3]]` becomes `[1, 2, 3]` and
/// `[[[1]], [[2]]]` becomes `[1, 2]`.
#[derive(Debug)]
pub struct FlattenMapper {
    core: MapperCore,
    fields: Vec<String>,
}

impl FlattenMapper {
    pub fn new(
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, FingerprintError> {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let contract = FieldContract::new(fields.clone(), fields.clone());
        let builder = FingerprintBuilder::new("FlattenMapper").arg("fields", &fields)?;
        let core = MapperCore::new("FlattenMapper", contract, builder)?;
        Ok(Self { core, fields })
    }
}

impl SingleTransform for FlattenMapper {
    fn transform(&self, record: &Record) -> Result<Record, TransformError> {
        let mut out = Record::new();
        for field in &self.fields {
            let value = record.get(field).ok_or_else(|| {
                TransformError::new(self.core.name(), format!("field '{field}' not found"))
            })?;
            let Value::Array(items) = value else {
                return Err(TransformError::new(
                    self.core.name(),
                    format!("field '{field}' is not a list"),
                ));
            };
            let mut items = items.clone();
            while items.first().is_some_and(Value::is_array) {
                let mut next = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(inner) => next.extend(inner),
                        _ => {
                            return Err(TransformError::new(
                                self.core.name(),
                                format!("field '{field}' mixes lists and scalars at the same depth"),
                            ));
                        }
                    }
                }
                items = next;
            }
            out.insert(field.clone(), Value::Array(items));
        }
        Ok(out)
    }
}

impl Mapper for FlattenMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Single(self)
    }
}

/// What happens to fields that are not unpacked by an [`UnpackingMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtraFields {
    /// Non-unpacked fields are absent from the unpacked records.
    Drop,
    /// Non-unpacked fields are copied into every unpacked record.
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
enum UnpackSelection {
    All,
    Unpack(Vec<String>),
    Ignore(Vec<String>),
}

/// Fans a record out into one record per element of its list-valued
/// fields.
///
/// The fields to unpack are fixed by the first record of the batch; each
/// must hold a list, and the lists are zipped positionally (the shortest
/// one bounds the fan-out). Remaining fields follow the [`ExtraFields`]
/// policy.
#[derive(Debug)]
pub struct UnpackingMapper {
    core: MapperCore,
    selection: UnpackSelection,
    extra: ExtraFields,
}

impl UnpackingMapper {
    /// Unpack every field of the record.
    pub fn all() -> Result<Self, FingerprintError> {
        Self::build(UnpackSelection::All, ExtraFields::Drop)
    }

    /// Unpack exactly the named fields.
    pub fn unpack(
        fields: impl IntoIterator<Item = impl Into<String>>,
        extra: ExtraFields,
    ) -> Result<Self, FingerprintError> {
        Self::build(
            UnpackSelection::Unpack(fields.into_iter().map(Into::into).collect()),
            extra,
        )
    }

    /// Unpack everything except the named fields.
    pub fn ignore(
        fields: impl IntoIterator<Item = impl Into<String>>,
        extra: ExtraFields,
    ) -> Result<Self, FingerprintError> {
        Self::build(
            UnpackSelection::Ignore(fields.into_iter().map(Into::into).collect()),
            extra,
        )
    }

    fn build(selection: UnpackSelection, extra: ExtraFields) -> Result<Self, FingerprintError> {
        let named: Vec<String> = match &selection {
            UnpackSelection::All => Vec::new(),
            UnpackSelection::Unpack(fields) | UnpackSelection::Ignore(fields) => fields.clone(),
        };
        let contract = FieldContract::new(named.clone(), named);
        let builder = FingerprintBuilder::new("UnpackingMapper")
            .arg("selection", &selection)?
            .arg("extra", &extra)?;
        let core = MapperCore::new("UnpackingMapper", contract, builder)?;
        Ok(Self {
            core,
            selection,
            extra,
        })
    }

    fn should_unpack(&self, field: &str) -> bool {
        match &self.selection {
            UnpackSelection::All => true,
            UnpackSelection::Unpack(fields) => fields.iter().any(|f| f == field),
            UnpackSelection::Ignore(fields) => !fields.iter().any(|f| f == field),
        }
    }

    fn unpack_record(
        &self,
        record: Record,
        cached_fields: &mut Option<Vec<String>>,
    ) -> Result<Vec<Record>, TransformError> {
        if cached_fields.is_none() {
            let fields: Vec<String> = record
                .keys()
                .filter(|key| self.should_unpack(key))
                .cloned()
                .collect();
            if fields.is_empty() {
                return Err(TransformError::new(self.core.name(), "no fields to unpack"));
            }
            *cached_fields = Some(fields);
        }
        let fields = cached_fields.as_deref().unwrap_or_default();

        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            match record.get(field) {
                Some(Value::Array(items)) => columns.push(items.as_slice()),
                Some(_) => {
                    return Err(TransformError::new(
                        self.core.name(),
                        format!("field '{field}' is not a list"),
                    ));
                }
                None => {
                    return Err(TransformError::new(
                        self.core.name(),
                        format!("field '{field}' not found"),
                    ));
                }
            }
        }

        let rows = columns.iter().map(|column| column.len()).min().unwrap_or(0);
        let mut out = Vec::with_capacity(rows);
        for i in 0..rows {
            let mut unpacked = Record::new();
            for (field, column) in fields.iter().zip(&columns) {
                unpacked.insert(field.clone(), column[i].clone());
            }
            if self.extra == ExtraFields::Repeat {
                for (key, value) in &record {
                    if !fields.contains(key) {
                        unpacked.insert(key.clone(), value.clone());
                    }
                }
            }
            out.push(unpacked);
        }
        Ok(out)
    }
}

struct UnpackIter<'a> {
    mapper: &'a UnpackingMapper,
    records: RecordIter<'a>,
    pending: std::vec::IntoIter<Record>,
    unpack_fields: Option<Vec<String>>,
    failed: bool,
}

impl Iterator for UnpackIter<'_> {
    type Item = Result<Record, TransformError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(Ok(record));
            }
            if self.failed {
                return None;
            }
            let packed = self.records.next()?;
            match self.mapper.unpack_record(packed, &mut self.unpack_fields) {
                Ok(unpacked) => self.pending = unpacked.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl BatchedTransform for UnpackingMapper {
    fn transform_batch<'a>(&'a self, records: RecordIter<'a>) -> TransformedIter<'a> {
        Box::new(UnpackIter {
            mapper: self,
            records,
            pending: Vec::new().into_iter(),
            unpack_fields: None,
            failed: false,
        })
    }
}

impl Mapper for UnpackingMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Batched(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::dataset::MapOptions;
    use crate::pipeline::IntoPipeline;

    fn record(v: serde_json::Value) -> Record {
        v.as_object().expect("test record must be an object").clone()
    }

    fn run(mapper: impl Mapper + 'static, records: Vec<Record>) -> Vec<Record> {
        mapper
            .into_pipeline()
            .map_records(records, &MapOptions::default())
            .unwrap()
    }

    #[test]
    fn flatten_collapses_nested_lists() {
        let out = run(
            FlattenMapper::new(["a"]).unwrap(),
            vec![record(json!({"a": [[1, 2], [3]], "b": "kept"}))],
        );
        assert_eq!(out, vec![record(json!({"a": [1, 2, 3], "b": "kept"}))]);
    }

    #[test]
    fn flatten_handles_deep_nesting_and_flat_input() {
        let out = run(
            FlattenMapper::new(["a"]).unwrap(),
            vec![record(json!({"a": [[[1]], [[2, 3]]]}))],
        );
        assert_eq!(out, vec![record(json!({"a": [1, 2, 3]}))]);

        let out = run(
            FlattenMapper::new(["a"]).unwrap(),
            vec![record(json!({"a": [1, 2]}))],
        );
        assert_eq!(out, vec![record(json!({"a": [1, 2]}))]);
    }

    #[test]
    fn flatten_rejects_non_list_fields() {
        let mapper = FlattenMapper::new(["a"]).unwrap();
        let err = mapper
            .into_pipeline()
            .map_records(vec![record(json!({"a": 1}))], &MapOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("not a list"));
    }

    #[test]
    fn unpack_all_fans_records_out() {
        let out = run(
            UnpackingMapper::all().unwrap(),
            vec![
                record(json!({"a": [1, 2], "b": ["x", "y"]})),
                record(json!({"a": [3], "b": ["z"]})),
            ],
        );
        assert_eq!(
            out,
            vec![
                record(json!({"a": 1, "b": "x"})),
                record(json!({"a": 2, "b": "y"})),
                record(json!({"a": 3, "b": "z"})),
            ]
        );
    }

    #[test]
    fn unpack_with_drop_discards_extra_fields() {
        let out = run(
            UnpackingMapper::unpack(["a"], ExtraFields::Drop).unwrap(),
            vec![record(json!({"a": [1, 2], "b": "meta"}))],
        );
        assert_eq!(out, vec![record(json!({"a": 1})), record(json!({"a": 2}))]);
    }

    #[test]
    fn unpack_with_repeat_copies_extra_fields() {
        let out = run(
            UnpackingMapper::unpack(["a"], ExtraFields::Repeat).unwrap(),
            vec![record(json!({"a": [1, 2], "b": "meta"}))],
        );
        assert_eq!(
            out,
            vec![
                record(json!({"a": 1, "b": "meta"})),
                record(json!({"a": 2, "b": "meta"})),
            ]
        );
    }

    #[test]
    fn ignore_unpacks_the_complement() {
        let out = run(
            UnpackingMapper::ignore(["b"], ExtraFields::Repeat).unwrap(),
            vec![record(json!({"a": [1, 2], "b": "meta"}))],
        );
        assert_eq!(
            out,
            vec![
                record(json!({"a": 1, "b": "meta"})),
                record(json!({"a": 2, "b": "meta"})),
            ]
        );
    }

    #[test]
    fn zip_is_bounded_by_the_shortest_list() {
        let out = run(
            UnpackingMapper::all().unwrap(),
            vec![record(json!({"a": [1, 2, 3], "b": ["x"]}))],
        );
        assert_eq!(out, vec![record(json!({"a": 1, "b": "x"}))]);
    }

    #[test]
    fn unpacking_a_scalar_field_fails() {
        let mapper = UnpackingMapper::all().unwrap();
        let err = mapper
            .into_pipeline()
            .map_records(vec![record(json!({"a": 1}))], &MapOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("not a list"));
    }
}
