use recordpipe::dataset::{BackendDataset, Dataset, MapOptions, TypeDescriptor};
use recordpipe::error::{PipelineError, PipelineResult, TransformError};
use recordpipe::fingerprint::FingerprintBuilder;
use recordpipe::mapper::{FieldContract, Mapper, MapperCore, SingleTransform, Transform};
use recordpipe::mappers::{ChangeFieldsMapper, ExtraFields, UnpackingMapper};
use recordpipe::pipeline::{IntoPipeline, MapperExt};
use recordpipe::record::{Batch, Record};
use serde_json::json;

#[derive(Debug)]
struct Doubler {
    core: MapperCore,
}

impl Doubler {
    fn new() -> Self {
        let core = MapperCore::new(
            "Doubler",
            FieldContract::unchecked(),
            FingerprintBuilder::new("Doubler"),
        )
        .unwrap();
        Self { core }
    }
}

impl SingleTransform for Doubler {
    fn transform(&self, record: &Record) -> Result<Record, TransformError> {
        let mut out = Record::new();
        for (key, value) in record {
            if let Some(n) = value.as_i64() {
                out.insert(key.clone(), json!(n * 2));
            }
        }
        Ok(out)
    }
}

impl Mapper for Doubler {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Single(self)
    }
}

/// A minimal backend: a list of records with hand-rolled map support.
#[derive(Debug, Clone)]
struct VecBackend {
    records: Vec<Record>,
    casts: Vec<(String, TypeDescriptor)>,
}

impl VecBackend {
    fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            casts: Vec::new(),
        }
    }
}

impl BackendDataset for VecBackend {
    fn column_names(&self) -> Vec<String> {
        self.records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn map_single(
        &self,
        f: &dyn Fn(&Record) -> Result<Record, TransformError>,
        remove_columns: Option<&[String]>,
        _options: &MapOptions,
    ) -> PipelineResult<Self> {
        let mut out = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let produced = f(record)?;
            let mut merged = record.clone();
            if let Some(remove) = remove_columns {
                for name in remove {
                    merged.remove(name);
                }
            }
            for (key, value) in produced {
                merged.insert(key, value);
            }
            out.push(merged);
        }
        Ok(Self {
            records: out,
            casts: self.casts.clone(),
        })
    }

    fn map_batched(
        &self,
        f: &dyn Fn(Batch) -> Result<Batch, TransformError>,
        remove_columns: Option<&[String]>,
        _options: &MapOptions,
    ) -> PipelineResult<Self> {
        let mut records = self.records.clone();
        if let Some(remove) = remove_columns {
            for record in &mut records {
                for name in remove {
                    record.remove(name);
                }
            }
        }
        let mapped = f(Batch::from_records(records))?;
        Ok(Self {
            records: mapped.into_records(),
            casts: self.casts.clone(),
        })
    }

    fn cast_column(mut self, name: &str, descriptor: &TypeDescriptor) -> PipelineResult<Self> {
        self.casts.push((name.to_string(), descriptor.clone()));
        Ok(self)
    }
}

fn record(v: serde_json::Value) -> Record {
    v.as_object().expect("test record must be an object").clone()
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_records() -> Vec<Record> {
    vec![
        record(json!({"a": 1, "b": "x"})),
        record(json!({"a": 2, "b": "y"})),
    ]
}

#[test]
fn record_and_batch_paths_agree_for_single_mappers() {
    init_logs();
    let pipeline = Doubler::new().chain(Doubler::new());

    let from_records = pipeline
        .map_records(sample_records(), &MapOptions::default())
        .unwrap();
    let from_batch = pipeline
        .map_batch(Batch::from_records(sample_records()), &MapOptions::default())
        .unwrap()
        .into_records();
    assert_eq!(from_records, from_batch);
    assert_eq!(from_records[0]["a"], json!(4));
}

#[test]
fn dataset_map_dispatches_on_shape() {
    let pipeline = Doubler::new().chain(ChangeFieldsMapper::keep(["a"]).unwrap());

    let records_in = Dataset::from_json(json!([{"a": 1, "b": "x"}])).unwrap();
    let batch_in = Dataset::from_json(json!({"a": [1], "b": ["x"]})).unwrap();

    let records_out = pipeline.map(records_in, &MapOptions::default()).unwrap();
    let batch_out = pipeline.map(batch_in, &MapOptions::default()).unwrap();

    assert_eq!(records_out.kind(), "records");
    assert_eq!(batch_out.kind(), "batch");
    assert_eq!(records_out.into_records(), batch_out.into_records());
}

#[test]
fn batched_fan_out_works_on_both_in_memory_paths() {
    let pipeline = UnpackingMapper::unpack(["a"], ExtraFields::Repeat)
        .unwrap()
        .into_pipeline();
    let records = vec![record(json!({"a": [1, 2], "b": "x"}))];

    let from_records = pipeline
        .map_records(records.clone(), &MapOptions::default())
        .unwrap();
    let from_batch = pipeline
        .map_batch(Batch::from_records(records), &MapOptions::default())
        .unwrap()
        .into_records();

    assert_eq!(from_records.len(), 2);
    assert_eq!(from_records, from_batch);
}

#[test]
fn backend_datasets_run_through_their_own_map() {
    let pipeline = Doubler::new().into_pipeline();
    let backend = VecBackend::new(sample_records());
    let out = pipeline.map_backend(backend, &MapOptions::default()).unwrap();
    assert_eq!(out.records[0]["a"], json!(2));
    assert_eq!(out.records[0]["b"], json!("x"));
}

#[test]
fn backend_remove_column_names_are_honored() {
    let pipeline = Doubler::new().into_pipeline();
    let options = MapOptions {
        remove_column_names: Some(vec!["b".to_string()]),
        ..MapOptions::default()
    };
    let out = pipeline
        .map_backend(VecBackend::new(sample_records()), &options)
        .unwrap();
    assert_eq!(out.records[0], record(json!({"a": 2})));
}

#[test]
fn always_remove_columns_drops_all_originals_on_backends() {
    let pipeline = ChangeFieldsMapper::keep(["a"]).unwrap().into_pipeline();
    let out = pipeline
        .map_backend(VecBackend::new(sample_records()), &MapOptions::default())
        .unwrap();
    assert_eq!(out.records, vec![record(json!({"a": 1})), record(json!({"a": 2}))]);
}

#[test]
fn backend_batched_mappers_reshape_through_batches() {
    let pipeline = UnpackingMapper::unpack(["a"], ExtraFields::Repeat)
        .unwrap()
        .into_pipeline();
    let backend = VecBackend::new(vec![record(json!({"a": [1, 2], "b": "x"}))]);
    let out = pipeline.map_backend(backend, &MapOptions::default()).unwrap();
    assert_eq!(
        out.records,
        vec![
            record(json!({"a": 1, "b": "x"})),
            record(json!({"a": 2, "b": "x"})),
        ]
    );
}

#[test]
fn missing_contract_field_fails_before_transforming() {
    let pipeline = ChangeFieldsMapper::drop(["ghost"]).unwrap().into_pipeline();
    let err = pipeline
        .map_records(sample_records(), &MapOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingField { ref field, ref mapper }
            if field == "ghost" && mapper == "ChangeFieldsMapper"
    ));
}

#[test]
fn unsupported_json_shapes_are_rejected() {
    let err = Dataset::from_json(json!(42)).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedDataset { .. }));
}
