//! Batched fan-in: collapsing runs of records into fixed-size windows.

use std::num::NonZeroUsize;

use crate::error::{FingerprintError, TransformError};
use crate::fingerprint::FingerprintBuilder;
use crate::mapper::{
    BatchedTransform, FieldContract, Mapper, MapperCore, RecordIter, Transform, TransformedIter,
};
use crate::record::{Record, Value};

/// Collapses every `batch_size` consecutive records into one record whose
/// fields hold the collected values as lists.
///
/// The inverse of [`super::UnpackingMapper`]: `{"a": 1}`, `{"a": 2}` with a
/// window of 2 becomes `{"a": [1, 2]}`. The first record of each window
/// fixes its field set; a later record introducing a new field fails the
/// batch. A trailing partial window is kept or dropped per `keep_last`.
#[derive(Debug)]
pub struct FixedBatchSizeMapper {
    core: MapperCore,
    batch_size: NonZeroUsize,
    keep_last: bool,
}

impl FixedBatchSizeMapper {
    pub fn new(batch_size: NonZeroUsize, keep_last: bool) -> Result<Self, FingerprintError> {
        let builder = FingerprintBuilder::new("FixedBatchSizeMapper")
            .arg("batch_size", &batch_size)?
            .arg("keep_last", &keep_last)?;
        let core = MapperCore::new("FixedBatchSizeMapper", FieldContract::unchecked(), builder)?;
        Ok(Self {
            core,
            batch_size,
            keep_last,
        })
    }

    fn accumulate(&self, window: &mut Option<Record>, sample: Record) -> Result<(), TransformError> {
        match window {
            None => {
                let mut acc = Record::new();
                for (key, value) in sample {
                    acc.insert(key, Value::Array(vec![value]));
                }
                *window = Some(acc);
            }
            Some(acc) => {
                for (key, value) in sample {
                    match acc.get_mut(&key).and_then(Value::as_array_mut) {
                        Some(list) => list.push(value),
                        None => {
                            return Err(TransformError::new(
                                self.core.name(),
                                format!("field '{key}' appeared mid-window"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

struct WindowIter<'a> {
    mapper: &'a FixedBatchSizeMapper,
    records: RecordIter<'a>,
    done: bool,
}

impl Iterator for WindowIter<'_> {
    type Item = Result<Record, TransformError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut window: Option<Record> = None;
        for _ in 0..self.mapper.batch_size.get() {
            let Some(sample) = self.records.next() else {
                self.done = true;
                return match window {
                    Some(acc) if self.mapper.keep_last => Some(Ok(acc)),
                    _ => None,
                };
            };
            if let Err(e) = self.mapper.accumulate(&mut window, sample) {
                self.done = true;
                return Some(Err(e));
            }
        }
        window.map(Ok)
    }
}

impl BatchedTransform for FixedBatchSizeMapper {
    fn transform_batch<'a>(&'a self, records: RecordIter<'a>) -> TransformedIter<'a> {
        Box::new(WindowIter {
            mapper: self,
            records,
            done: false,
        })
    }
}

impl Mapper for FixedBatchSizeMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Batched(self)
    }
}
