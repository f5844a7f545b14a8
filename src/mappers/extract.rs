//! Nested-path extraction into flat record fields.

use crate::error::{FingerprintError, TransformError};
use crate::fingerprint::FingerprintBuilder;
use crate::mapper::{FieldContract, Mapper, MapperCore, SingleTransform, Transform};
use crate::nested::{Missing, Nested};
use crate::record::{Record, Value};

/// Extracts values from deep inside each record with [`Nested`] paths and
/// writes them to flat output fields.
///
/// Each spec pairs an output field name with a path evaluated against the
/// whole record via [`Nested::select`]. With `null_on_missing`, locations
/// the path cannot reach become `null` instead of failing the record.
#[derive(Debug)]
pub struct NestedExtractMapper {
    core: MapperCore,
    specs: Vec<(String, Nested)>,
    null_on_missing: bool,
}

impl NestedExtractMapper {
    pub fn new(
        specs: impl IntoIterator<Item = (impl Into<String>, Nested)>,
        null_on_missing: bool,
    ) -> Result<Self, FingerprintError> {
        let specs: Vec<(String, Nested)> = specs
            .into_iter()
            .map(|(field, path)| (field.into(), path))
            .collect();
        let rendered: Vec<(String, String)> = specs
            .iter()
            .map(|(field, path)| (field.clone(), path.to_str()))
            .collect();
        let contract = FieldContract::new(
            Vec::<String>::new(),
            specs.iter().map(|(field, _)| field.clone()),
        );
        let builder = FingerprintBuilder::new("NestedExtractMapper")
            .arg("specs", &rendered)?
            .arg("null_on_missing", &null_on_missing)?;
        let core = MapperCore::new("NestedExtractMapper", contract, builder)?;
        Ok(Self {
            core,
            specs,
            null_on_missing,
        })
    }
}

impl SingleTransform for NestedExtractMapper {
    fn transform(&self, record: &Record) -> Result<Record, TransformError> {
        let tree = Value::Object(record.clone());
        let missing = if self.null_on_missing {
            Missing::Null
        } else {
            Missing::Raise
        };
        let mut out = Record::new();
        for (field, path) in &self.specs {
            let selected = path
                .select(&tree, missing)
                .map_err(|e| TransformError::new(self.core.name(), e.to_string()))?;
            out.insert(field.clone(), selected);
        }
        Ok(out)
    }
}

impl Mapper for NestedExtractMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Single(self)
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

    fn qa_record() -> Record {
        record(json!({
            "question": "why",
            "answers": {"text": [{"span": {"start": 3}}, {"span": {"start": 7}}]}
        }))
    }

    #[test]
    fn extracted_fields_merge_into_the_record() {
        let path = Nested::parse("answers.text.[span.start]").unwrap();
        let mapper = NestedExtractMapper::new([("starts", path)], false).unwrap();
        let out = mapper
            .into_pipeline()
            .map_records(vec![qa_record()], &MapOptions::default())
            .unwrap();
        assert_eq!(out[0]["starts"], json!([3, 7]));
        assert_eq!(out[0]["question"], json!("why"));
    }

    #[test]
    fn remove_columns_keeps_only_extracted_fields() {
        let path = Nested::parse("answers.text.[span.start]").unwrap();
        let mapper = NestedExtractMapper::new([("starts", path)], false).unwrap();
        let out = mapper
            .into_pipeline()
            .map_records(vec![qa_record()], &MapOptions::removing_columns())
            .unwrap();
        assert_eq!(out, vec![record(json!({"starts": [3, 7]}))]);
    }

    #[test]
    fn unreachable_path_fails_the_record_by_default() {
        let path = Nested::parse("answers.ghost").unwrap();
        let mapper = NestedExtractMapper::new([("out", path)], false).unwrap();
        let err = mapper
            .into_pipeline()
            .map_records(vec![qa_record()], &MapOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn null_on_missing_substitutes_instead() {
        let path = Nested::parse("answers.ghost").unwrap();
        let mapper = NestedExtractMapper::new([("out", path)], true).unwrap();
        let out = mapper
            .into_pipeline()
            .map_records(vec![qa_record()], &MapOptions::default())
            .unwrap();
        assert_eq!(out[0]["out"], json!(null));
    }

    #[test]
    fn path_and_policy_shape_the_fingerprint() {
        let path = || Nested::parse("a.b").unwrap();
        let a = NestedExtractMapper::new([("out", path())], false).unwrap();
        let b = NestedExtractMapper::new([("out", path())], true).unwrap();
        let c = NestedExtractMapper::new([("other", path())], false).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
