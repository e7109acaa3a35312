//! # Core Type Definitions
//!
//! This module contains the shared types of the hivecase indexer:
//! - Identifiers (`NodeId`, `StringId`, `ValueId`, `FileId`)
//! - Namespace and attribute records (`TreeNode`, `ValueKey`, `KeyValue`)
//! - Evidence classification (`ArtifactType`, `Classification`, `EvidenceOutcome`)
//! - Error types (`CaseError`)
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! and iterate in a deterministic order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a node in the namespace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Identifier of an interned string or content blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StringId(pub u64);

/// Identifier of a deduplicated value. Doubles as the attribute row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u64);

/// Identifier of an evidence source within a case. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u64);

// =============================================================================
// NAMESPACE RECORDS
// =============================================================================

/// One node of the namespace tree, and equally one row of the node table.
///
/// `(parent, label)` identifies at most one node within a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: NodeId,
    pub label: StringId,
}

impl TreeNode {
    #[must_use]
    pub const fn new(id: NodeId, parent: NodeId, label: StringId) -> Self {
        Self { id, parent, label }
    }

    /// Session cache key for this node.
    #[must_use]
    pub const fn key(&self) -> (NodeId, StringId) {
        (self.parent, self.label)
    }
}

/// Composite content key of the value dedup table.
///
/// Field order matches the lookup order used when the table is rebuilt from
/// the attribute table: node, text rendering, raw content, type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueKey {
    pub node: NodeId,
    pub ascii: StringId,
    pub raw: StringId,
    pub type_tag: String,
}

/// A named value attached to a node. One row of the attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Row identity; equal to the value id assigned by the value table.
    pub id: ValueId,
    /// Node carrying the value name (a child of the owning key).
    pub node: NodeId,
    /// Evidence source the value was first seen in.
    pub file: FileId,
    pub raw: StringId,
    pub ascii: StringId,
    pub type_tag: String,
}

impl KeyValue {
    /// The dedup key this row was registered under.
    #[must_use]
    pub fn value_key(&self) -> ValueKey {
        ValueKey {
            node: self.node,
            ascii: self.ascii,
            raw: self.raw,
            type_tag: self.type_tag.clone(),
        }
    }
}

// =============================================================================
// EVIDENCE CLASSIFICATION
// =============================================================================

/// Kind of registry artifact recovered from an evidence source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    System,
    Software,
    Sam,
    Security,
    NtUser,
    UsrClass,
    Default,
    /// Anything the acquirer could name but that is not a standard hive.
    Other(String),
}

impl ArtifactType {
    /// Parse a hive label as written by acquisition tooling.
    ///
    /// Matching is case-insensitive; `NTUSER.DAT` and `UsrClass.dat` are
    /// accepted with or without their extension.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let upper = label.trim().to_ascii_uppercase();
        let stem = upper.strip_suffix(".DAT").unwrap_or(&upper);
        match stem {
            "SYSTEM" => Self::System,
            "SOFTWARE" => Self::Software,
            "SAM" => Self::Sam,
            "SECURITY" => Self::Security,
            "NTUSER" => Self::NtUser,
            "USRCLASS" => Self::UsrClass,
            "DEFAULT" => Self::Default,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "SYSTEM",
            Self::Software => "SOFTWARE",
            Self::Sam => "SAM",
            Self::Security => "SECURITY",
            Self::NtUser => "NTUSER",
            Self::UsrClass => "USRCLASS",
            Self::Default => "DEFAULT",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of acquiring one evidence source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The source was indexed and yielded these artifact types.
    Accepted(Vec<ArtifactType>),
    /// The source could not be used; it is dropped from the run.
    Skipped,
    /// The source contradicts the case being extended; the run must abort.
    Rejected,
}

/// One evidence source handed to an acquirer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSource {
    pub path: PathBuf,
    pub file: FileId,
}

/// An evidence source that survived acquisition in the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceOutcome {
    pub file: FileId,
    pub path: PathBuf,
    pub artifact_types: Vec<ArtifactType>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while building, extending or persisting a case.
///
/// - `BadEvidence` and `NoValidEvidence` abort a run before anything is
///   committed.
/// - Store and snapshot failures propagate unmodified; nothing is retried.
#[derive(Debug, Error)]
pub enum CaseError {
    /// An evidence source is inconsistent with the case being extended.
    #[error("Bad evidence {evidence:?}: {reason}")]
    BadEvidence { evidence: PathBuf, reason: String },

    /// Every evidence source in the run was skipped.
    #[error("No valid files were added as evidence")]
    NoValidEvidence,

    /// A node id is already bound to a different (parent, label) pair.
    #[error(
        "Node {id:?} is stored as ({stored_parent:?}, {stored_label:?}) but requested as ({parent:?}, {label:?})"
    )]
    ConflictingNode {
        id: NodeId,
        stored_parent: NodeId,
        stored_label: StringId,
        parent: NodeId,
        label: StringId,
    },

    /// The requested node does not exist in the namespace tree.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// An orchestrator operation was called out of order.
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    /// A fresh case was requested in a directory that already holds one.
    #[error("A case already exists in {0:?}")]
    CaseExists(PathBuf),

    /// A resume was requested for a directory without a case snapshot.
    #[error("No case snapshot found in {0:?}")]
    CaseNotFound(PathBuf),

    /// The store references content the snapshot does not know about.
    #[error("Snapshot is older than the store: {0}")]
    StaleSnapshot(String),

    /// The relational store failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_type_parse_is_case_insensitive() {
        assert_eq!(ArtifactType::parse("system"), ArtifactType::System);
        assert_eq!(ArtifactType::parse("NTUSER.DAT"), ArtifactType::NtUser);
        assert_eq!(ArtifactType::parse("UsrClass.dat"), ArtifactType::UsrClass);
    }

    #[test]
    fn artifact_type_other_keeps_label() {
        let other = ArtifactType::parse(" Amcache.hve ");
        assert_eq!(other, ArtifactType::Other("Amcache.hve".to_string()));
        assert_eq!(other.as_str(), "Amcache.hve");
    }

    #[test]
    fn value_key_round_trips_from_row() {
        let row = KeyValue {
            id: ValueId(7),
            node: NodeId(3),
            file: FileId(1),
            raw: StringId(10),
            ascii: StringId(11),
            type_tag: "REG_SZ".to_string(),
        };
        let key = row.value_key();
        assert_eq!(key.node, NodeId(3));
        assert_eq!(key.ascii, StringId(11));
        assert_eq!(key.raw, StringId(10));
    }

    #[test]
    fn tree_node_key_is_parent_then_label() {
        let node = TreeNode::new(NodeId(5), NodeId(1), StringId(9));
        assert_eq!(node.key(), (NodeId(1), StringId(9)));
    }
}
