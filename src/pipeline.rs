//! Pipeline composition and execution.
//!
//! A [`Pipeline`] is the canonical ordered sequence of mappers. Composition
//! uses operator-like chaining: `pipeline >> x` appends, `pipeline << x`
//! prepends, and either side may be a bare mapper, a shared
//! `Arc<dyn Mapper>`, or another pipeline (lifted through [`IntoPipeline`]).
//! Chaining is associative: `(a >> b) >> c` and `a >> (b >> c)` flatten to
//! the same sequence.
//!
//! Execution folds the dataset through the stages left to right; each
//! stage's output feeds the next. Pipelines are build-once and read-only
//! during execution; mappers are shared between pipelines by `Arc` cloning
//! and carry no pipeline linkage of their own.

use std::fmt;
use std::ops::{Shl, Shr};
use std::sync::Arc;

use log::debug;

use crate::dataset::{BackendDataset, Dataset, MapOptions};
use crate::dispatch;
use crate::error::PipelineResult;
use crate::fingerprint::Fingerprint;
use crate::mapper::{mapper_eq, Mapper};
use crate::record::{Batch, Record};

/// Conversion into a pipeline, used to lift bare mappers into singleton
/// pipelines when chaining.
pub trait IntoPipeline {
    fn into_pipeline(self) -> Pipeline;
}

impl IntoPipeline for Pipeline {
    fn into_pipeline(self) -> Pipeline {
        self
    }
}

impl<M: Mapper + 'static> IntoPipeline for M {
    fn into_pipeline(self) -> Pipeline {
        Pipeline {
            mappers: vec![Arc::new(self)],
        }
    }
}

impl IntoPipeline for Arc<dyn Mapper> {
    fn into_pipeline(self) -> Pipeline {
        Pipeline { mappers: vec![self] }
    }
}

/// Chaining entry point for bare mappers: `a.chain(b)` starts a pipeline.
pub trait MapperExt: Mapper + Sized + 'static {
    fn chain(self, next: impl IntoPipeline) -> Pipeline {
        self.into_pipeline() >> next
    }
}

impl<M: Mapper + Sized + 'static> MapperExt for M {}

/// An ordered sequence of mappers applied left to right.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mappers: Vec<Arc<dyn Mapper>>,
}

impl Pipeline {
    /// An empty pipeline; mapping with it returns the dataset unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a sequence of pipelines (or lifted mappers) into one.
    pub fn chain(parts: impl IntoIterator<Item = Pipeline>) -> Self {
        let mut mappers = Vec::new();
        for part in parts {
            mappers.extend(part.mappers);
        }
        Self { mappers }
    }

    /// Append a mapper in place.
    pub fn push(&mut self, mapper: impl Mapper + 'static) {
        self.mappers.push(Arc::new(mapper));
    }

    /// Number of mappers.
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Whether the pipeline has no mappers.
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// The mapper at `idx`, if any. The returned handle is independent of
    /// this pipeline and can be chained elsewhere.
    pub fn get(&self, idx: usize) -> Option<Arc<dyn Mapper>> {
        self.mappers.get(idx).cloned()
    }

    /// Iterate the mappers in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Mapper>> {
        self.mappers.iter()
    }

    /// Aggregate fingerprint over the member fingerprints in order, used as
    /// a cache key for the whole pipeline.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::combine(self.mappers.iter().map(|m| m.fingerprint()))
    }

    /// Transform an in-memory dataset by applying every mapper in order.
    pub fn map(&self, dataset: Dataset, options: &MapOptions) -> PipelineResult<Dataset> {
        match dataset {
            Dataset::Records(records) => {
                Ok(Dataset::Records(self.map_records(records, options)?))
            }
            Dataset::Batch(batch) => Ok(Dataset::Batch(self.map_batch(batch, options)?)),
        }
    }

    /// Transform a sequence of records.
    pub fn map_records(
        &self,
        mut records: Vec<Record>,
        options: &MapOptions,
    ) -> PipelineResult<Vec<Record>> {
        for mapper in &self.mappers {
            debug!("stage {} ({})", mapper.name(), mapper.fingerprint());
            records = dispatch::map_records(mapper.as_ref(), records, options)?;
        }
        Ok(records)
    }

    /// Transform a columnar batch in place through its view.
    pub fn map_batch(&self, mut batch: Batch, options: &MapOptions) -> PipelineResult<Batch> {
        for mapper in &self.mappers {
            debug!("stage {} ({})", mapper.name(), mapper.fingerprint());
            batch = dispatch::map_batch(mapper.as_ref(), batch, options)?;
        }
        Ok(batch)
    }

    /// Transform a backend-native dataset, delegating execution to the
    /// backend's own map machinery at every stage.
    pub fn map_backend<B: BackendDataset>(
        &self,
        mut dataset: B,
        options: &MapOptions,
    ) -> PipelineResult<B> {
        for mapper in &self.mappers {
            debug!("stage {} ({})", mapper.name(), mapper.fingerprint());
            dataset = dispatch::map_backend(mapper.as_ref(), dataset, options)?;
        }
        Ok(dataset)
    }
}

impl<R: IntoPipeline> Shr<R> for Pipeline {
    type Output = Pipeline;

    /// `self >> other`: run `self` first, then `other`.
    fn shr(mut self, other: R) -> Pipeline {
        self.mappers.extend(other.into_pipeline().mappers);
        self
    }
}

impl<R: IntoPipeline> Shl<R> for Pipeline {
    type Output = Pipeline;

    /// `self << other`: run `other` first, then `self`.
    fn shl(self, other: R) -> Pipeline {
        other.into_pipeline() >> self
    }
}

impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        self.mappers.len() == other.mappers.len()
            && self
                .mappers
                .iter()
                .zip(&other.mappers)
                .all(|(a, b)| mapper_eq(a.as_ref(), b.as_ref()))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipeline(")?;
        for (i, mapper) in self.mappers.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            let fp = mapper.fingerprint().as_str();
            write!(f, "{}({})", mapper.name(), &fp[..8.min(fp.len())])?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::TransformError;
    use crate::fingerprint::FingerprintBuilder;
    use crate::mapper::{FieldContract, MapperCore, SingleTransform, Transform};

    fn record(v: serde_json::Value) -> Record {
        v.as_object().expect("test record must be an object").clone()
    }

    #[derive(Debug)]
    struct PlusN {
        core: MapperCore,
        n: i64,
    }

    impl PlusN {
        fn new(n: i64) -> Self {
            let core = MapperCore::new(
                "PlusN",
                FieldContract::unchecked(),
                FingerprintBuilder::new("PlusN").arg("n", &n).unwrap(),
            )
            .unwrap();
            Self { core, n }
        }
    }

    impl SingleTransform for PlusN {
        fn transform(&self, record: &Record) -> Result<Record, TransformError> {
            let mut out = record.clone();
            for value in out.values_mut() {
                if let Some(v) = value.as_i64() {
                    *value = json!(v + self.n);
                }
            }
            Ok(out)
        }
    }

    impl Mapper for PlusN {
        fn core(&self) -> &MapperCore {
            &self.core
        }

        fn transform(&self) -> Transform<'_> {
            Transform::Single(self)
        }
    }

    #[test]
    fn chaining_is_associative() {
        let left = (PlusN::new(1).chain(PlusN::new(2))) >> PlusN::new(3);
        let right = PlusN::new(1).chain(PlusN::new(2).chain(PlusN::new(3)));
        assert_eq!(left.len(), 3);
        assert_eq!(left, right);
        assert_eq!(left.fingerprint(), right.fingerprint());
    }

    #[test]
    fn left_append_reverses_order() {
        let forward = PlusN::new(1).chain(PlusN::new(2));
        let backward = PlusN::new(2).into_pipeline() << PlusN::new(1);
        assert_eq!(forward, backward);
    }

    #[test]
    fn equality_is_fingerprint_based() {
        let a = PlusN::new(1).chain(PlusN::new(2));
        let b = PlusN::new(1).chain(PlusN::new(2));
        let c = PlusN::new(1).chain(PlusN::new(3));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn map_folds_stages_left_to_right() {
        let pipeline = PlusN::new(1).chain(PlusN::new(1));
        let out = pipeline
            .map_records(vec![record(json!({"a": 1, "b": 2}))], &MapOptions::default())
            .unwrap();
        assert_eq!(out, vec![record(json!({"a": 3, "b": 4}))]);
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let records = vec![record(json!({"a": 1}))];
        let out = Pipeline::new()
            .map_records(records.clone(), &MapOptions::default())
            .unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn shared_mappers_can_join_multiple_pipelines() {
        let shared: Arc<dyn Mapper> = Arc::new(PlusN::new(5));
        let a = Pipeline::new() >> Arc::clone(&shared);
        let b = Pipeline::new() >> shared;
        assert_eq!(a, b);
    }

    #[test]
    fn display_names_stages_in_order() {
        let pipeline = PlusN::new(1).chain(PlusN::new(2));
        let shown = pipeline.to_string();
        assert!(shown.starts_with("Pipeline(PlusN("));
        assert!(shown.contains(" -> "));
    }

    #[test]
    fn chain_flattens_pipelines() {
        let p = Pipeline::chain([
            PlusN::new(1).into_pipeline(),
            PlusN::new(2).chain(PlusN::new(3)),
        ]);
        assert_eq!(p.len(), 3);
    }
}
