//! Stable fingerprints for mappers and pipelines.
//!
//! A [`Fingerprint`] is a content-stable hash of a mapper's
//! construction-time configuration, used as a cache key. It depends only on
//! the arguments recorded during construction, never on runtime state or on
//! pipeline linkage: constructing the same mapper type with the same
//! arguments, in different processes, yields the same fingerprint.
//!
//! Every constructor layer records its received configuration into a
//! [`FingerprintBuilder`] under its own type-name scope (including the base
//! contract fields recorded by [`crate::mapper::MapperCore`]). The collected
//! document is canonicalized -- object keys recursively sorted, so argument
//! recording order and hash-map iteration order are irrelevant -- then
//! digested with SHA-256.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest as _, Sha256};

use crate::error::FingerprintError;

/// A hex-encoded SHA-256 digest of a canonicalized configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rehydrate a fingerprint computed earlier (e.g. after
    /// deserialization). The fingerprint is never recomputed for a
    /// rehydrated mapper.
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Compose an aggregate fingerprint from ordered parts.
    ///
    /// Used for pipeline-level fingerprints: the digest covers each member
    /// fingerprint in pipeline order, so reordering mappers changes the
    /// result.
    pub fn combine<'a>(parts: impl IntoIterator<Item = &'a Fingerprint>) -> Fingerprint {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0.as_bytes());
            hasher.update(b"\n");
        }
        let digest = hasher.finalize();
        Fingerprint(format!("{digest:x}"))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only collector of constructor arguments, keyed by type name.
///
/// ```
/// use recordpipe::fingerprint::FingerprintBuilder;
///
/// # fn main() -> Result<(), recordpipe::FingerprintError> {
/// let fp = FingerprintBuilder::new("TruncateMapper")
///     .arg("max_len", &512usize)?
///     .arg("from_end", &false)?
///     .finish();
/// let again = FingerprintBuilder::new("TruncateMapper")
///     .arg("from_end", &false)?
///     .arg("max_len", &512usize)?
///     .finish();
/// assert_eq!(fp, again);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    mapper: String,
    scope: String,
    scopes: BTreeMap<String, BTreeMap<String, Value>>,
}

impl FingerprintBuilder {
    /// Start collecting arguments for the named mapper type. The mapper's
    /// own name is the initial scope.
    pub fn new(mapper: impl Into<String>) -> Self {
        let mapper = mapper.into();
        // the type name participates in the digest even if the constructor
        // records no arguments of its own
        let mut scopes = BTreeMap::new();
        scopes.insert(mapper.clone(), BTreeMap::new());
        Self {
            scope: mapper.clone(),
            mapper,
            scopes,
        }
    }

    /// Switch to the scope of another constructor layer (e.g. a shared core
    /// or an embedded component recording its own configuration).
    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scope = name.into();
        self
    }

    /// Record one named argument in the current scope.
    ///
    /// The value is serialized to a canonical representation, not hashed by
    /// identity: semantically equal values always serialize identically.
    /// Fails fast with [`FingerprintError`] naming the argument if the value
    /// cannot be serialized (e.g. a map keyed by a non-string type).
    pub fn arg(mut self, name: &str, value: &impl Serialize) -> Result<Self, FingerprintError> {
        let value = serde_json::to_value(value).map_err(|e| FingerprintError {
            mapper: self.mapper.clone(),
            argument: name.to_string(),
            message: e.to_string(),
        })?;
        self.scopes
            .entry(self.scope.clone())
            .or_default()
            .insert(name.to_string(), canonicalize(value));
        Ok(self)
    }

    /// Finalize the collected document into a [`Fingerprint`].
    pub fn finish(self) -> Fingerprint {
        let mut doc = serde_json::Map::new();
        for (scope, args) in self.scopes {
            let mut entry = serde_json::Map::new();
            for (name, value) in args {
                entry.insert(name, value);
            }
            doc.insert(scope, Value::Object(entry));
        }
        let bytes = serde_json::to_vec(&Value::Object(doc))
            .expect("serializing a canonical JSON value cannot fail");
        let digest = Sha256::digest(&bytes);
        Fingerprint(format!("{digest:x}"))
    }
}

/// Recursively sort object keys so map iteration order never leaks into the
/// digest.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map.into_iter().collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
