//! # Evidence Acquisition
//!
//! The seam between evidence containers and the indexer.
//!
//! An `Acquirer` receives one evidence source at a time together with the
//! case being built, populates the namespace tree and value table through
//! `CaseContext::insert_key` / `insert_value`, and classifies the source as
//! accepted, skipped or rejected.
//!
//! `ExportAcquirer` consumes pre-parsed hive exports (JSON documents written
//! by an external hive parser). Binary hive decoding is out of scope here.

use crate::case::CaseContext;
use crate::primitives::{DEFAULT_MAX_EXPORT_BYTES, MAX_KEY_DEPTH};
use crate::{ArtifactType, CaseError, Classification, EvidenceSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Turns an evidence source into indexed content.
pub trait Acquirer {
    /// Acquire `source` into `case`.
    ///
    /// `Ok(Skipped)` and `Ok(Rejected)` are classifications, not failures;
    /// `Err` is reserved for faults of the case itself (store, invariants).
    fn acquire(
        &mut self,
        source: &EvidenceSource,
        case: &mut CaseContext,
    ) -> Result<Classification, CaseError>;
}

// =============================================================================
// EXPORT DOCUMENT
// =============================================================================

/// A parsed hive rendered as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub artifact_type: String,
    #[serde(default)]
    pub keys: Vec<ExportKey>,
}

/// One registry key and its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportKey {
    /// Key path from the hive root, one segment per element.
    pub path: Vec<String>,
    #[serde(default)]
    pub values: Vec<ExportValue>,
}

/// One registry value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportValue {
    /// Value name; empty for the key's default value.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Raw value data.
    #[serde(default)]
    pub raw: Vec<u8>,
    /// Text rendering produced by the parser.
    #[serde(default)]
    pub text: String,
}

impl ExportDocument {
    /// Structural checks that must pass before anything is inserted.
    fn check(&self) -> Result<(), String> {
        for key in &self.keys {
            if key.path.is_empty() {
                return Err("key with empty path".to_string());
            }
            if key.path.len() > MAX_KEY_DEPTH {
                return Err(format!(
                    "key path depth {} exceeds {}",
                    key.path.len(),
                    MAX_KEY_DEPTH
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// EXPORT ACQUIRER
// =============================================================================

/// Acquirer for JSON hive exports.
///
/// Classification rules:
/// - a path already recorded in the case (from an earlier run) is
///   `Rejected`: the same evidence cannot be added to a case twice;
/// - a path already accepted earlier in this run is `Skipped`;
/// - a missing, oversized or malformed export is `Skipped`.
#[derive(Debug, Clone)]
pub struct ExportAcquirer {
    max_export_bytes: u64,
    seen: BTreeSet<PathBuf>,
}

impl Default for ExportAcquirer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPORT_BYTES)
    }
}

impl ExportAcquirer {
    #[must_use]
    pub fn new(max_export_bytes: u64) -> Self {
        Self {
            max_export_bytes,
            seen: BTreeSet::new(),
        }
    }

    fn load(&self, source: &EvidenceSource) -> Result<ExportDocument, String> {
        let metadata = std::fs::metadata(&source.path).map_err(|e| e.to_string())?;
        if !metadata.is_file() {
            return Err("not a regular file".to_string());
        }
        if metadata.len() > self.max_export_bytes {
            return Err(format!(
                "size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                self.max_export_bytes
            ));
        }
        let bytes = std::fs::read(&source.path).map_err(|e| e.to_string())?;
        let document: ExportDocument =
            serde_json::from_slice(&bytes).map_err(|e| format!("malformed export: {}", e))?;
        document.check()?;
        Ok(document)
    }
}

impl Acquirer for ExportAcquirer {
    fn acquire(
        &mut self,
        source: &EvidenceSource,
        case: &mut CaseContext,
    ) -> Result<Classification, CaseError> {
        if case.contains_evidence(&source.path) {
            tracing::warn!(path = %source.path.display(), "evidence already part of this case");
            return Ok(Classification::Rejected);
        }
        if self.seen.contains(&source.path) {
            tracing::warn!(path = %source.path.display(), "evidence listed twice, skipping repeat");
            return Ok(Classification::Skipped);
        }

        let document = match self.load(source) {
            Ok(document) => document,
            Err(reason) => {
                tracing::warn!(path = %source.path.display(), %reason, "skipping evidence");
                return Ok(Classification::Skipped);
            }
        };

        let mut values = 0usize;
        for key in &document.keys {
            let node = case.insert_key(&key.path)?;
            for value in &key.values {
                case.insert_value(
                    node,
                    &value.name,
                    &value.raw,
                    &value.text,
                    &value.type_tag,
                    source.file,
                )?;
                values += 1;
            }
        }

        let artifact = ArtifactType::parse(&document.artifact_type);
        tracing::debug!(
            path = %source.path.display(),
            file = source.file.0,
            artifact = %artifact,
            keys = document.keys.len(),
            values,
            "export acquired"
        );
        self.seen.insert(source.path.clone());
        Ok(Classification::Accepted(vec![artifact]))
    }
}

// =============================================================================
// TESTS
// =============================================================================
