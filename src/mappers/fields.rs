//! Mappers that reshape the field set of each record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{FingerprintError, TransformError};
use crate::fingerprint::FingerprintBuilder;
use crate::mapper::{FieldContract, Mapper, MapperCore, SingleTransform, Transform};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
enum Selection {
    Keep(Vec<String>),
    Drop(Vec<String>),
}

/// Keeps or drops a named set of fields; everything else goes the other
/// way.
///
/// Always strips the original columns from the result, so the surviving
/// field set is exactly what the transform returns on every dispatch path.
#[derive(Debug)]
pub struct ChangeFieldsMapper {
    core: MapperCore,
    selection: Selection,
}

impl ChangeFieldsMapper {
    /// Keep only the named fields. The kept fields become the declared
    /// outputs, so a record missing one of them fails the contract check.
    pub fn keep(
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, FingerprintError> {
        Self::build(Selection::Keep(collect(fields)))
    }

    /// Drop the named fields and keep the rest. The dropped fields become
    /// the declared inputs, so dropping a field that was never there fails
    /// the contract check.
    pub fn drop(
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, FingerprintError> {
        Self::build(Selection::Drop(collect(fields)))
    }

    fn build(selection: Selection) -> Result<Self, FingerprintError> {
        let contract = match &selection {
            Selection::Keep(fields) => FieldContract::new(Vec::<String>::new(), fields.clone()),
            Selection::Drop(fields) => FieldContract::new(fields.clone(), Vec::<String>::new()),
        };
        let builder =
            FingerprintBuilder::new("ChangeFieldsMapper").arg("selection", &selection)?;
        let core = MapperCore::new("ChangeFieldsMapper", contract, builder)?;
        Ok(Self { core, selection })
    }
}

impl SingleTransform for ChangeFieldsMapper {
    fn transform(&self, record: &Record) -> Result<Record, TransformError> {
        let out = match &self.selection {
            Selection::Keep(fields) => record
                .iter()
                .filter(|(key, _)| fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Selection::Drop(fields) => record
                .iter()
                .filter(|(key, _)| !fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };
        Ok(out)
    }
}

impl Mapper for ChangeFieldsMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Single(self)
    }

    fn always_remove_columns(&self) -> bool {
        true
    }
}

/// Renames fields according to an old-name to new-name mapping.
///
/// Fields outside the mapping pass through unchanged unless `remove_rest`
/// is set, in which case only the renamed fields survive.
#[derive(Debug)]
pub struct RenameFieldsMapper {
    core: MapperCore,
    renames: BTreeMap<String, String>,
    remove_rest: bool,
}

impl RenameFieldsMapper {
    pub fn new(
        renames: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        remove_rest: bool,
    ) -> Result<Self, FingerprintError> {
        let renames: BTreeMap<String, String> = renames
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        let contract = FieldContract::new(renames.keys().cloned(), renames.values().cloned());
        let builder = FingerprintBuilder::new("RenameFieldsMapper")
            .arg("renames", &renames)?
            .arg("remove_rest", &remove_rest)?;
        let core = MapperCore::new("RenameFieldsMapper", contract, builder)?;
        Ok(Self {
            core,
            renames,
            remove_rest,
        })
    }
}

impl SingleTransform for RenameFieldsMapper {
    fn transform(&self, record: &Record) -> Result<Record, TransformError> {
        let out = record
            .iter()
            .filter_map(|(key, value)| match self.renames.get(key) {
                Some(renamed) => Some((renamed.clone(), value.clone())),
                None if !self.remove_rest => Some((key.clone(), value.clone())),
                None => None,
            })
            .collect();
        Ok(out)
    }
}

impl Mapper for RenameFieldsMapper {
    fn core(&self) -> &MapperCore {
        &self.core
    }

    fn transform(&self) -> Transform<'_> {
        Transform::Single(self)
    }

    fn always_remove_columns(&self) -> bool {
        true
    }
}

fn collect(fields: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    fields.into_iter().map(Into::into).collect()
}
