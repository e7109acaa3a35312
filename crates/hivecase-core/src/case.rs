//! # Case Context
//!
//! The root aggregate of one forensic case: string table, value table,
//! namespace tree and the evidence recorded so far.
//!
//! A `CaseContext` is the unit of checkpointing. Caches that are rebuilt from
//! the relational store on resume (the tree's session cache and the value
//! table's key map) are dropped by `prepare_checkpoint` and restored by
//! `rehydrate`.

use crate::primitives::FIRST_FILE_ID;
use crate::storage::RelationalStore;
use crate::strings::StringTable;
use crate::tree::{EdgeReconcile, NamespaceStore, NamespaceTree};
use crate::values::ValueTable;
use crate::{
    ArtifactType, CaseError, EvidenceOutcome, FileId, NodeId, StringId, ValueId, ValueKey,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Evidence source recorded in a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub file: FileId,
    pub path: PathBuf,
    pub artifact_types: Vec<ArtifactType>,
    /// Processing run (1-based) that added this source.
    pub run: u32,
}

/// Counters produced by `CaseContext::rehydrate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateStats {
    pub edges: usize,
    /// Edges whose node was missing from the snapshot and was adopted.
    pub adopted: usize,
    pub attributes: usize,
    /// Strings committed after the snapshot was written.
    pub adopted_strings: usize,
}

/// Root aggregate for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseContext {
    case_directory: PathBuf,
    strings: StringTable,
    values: ValueTable,
    tree: NamespaceTree,
    evidence: Vec<EvidenceRecord>,
    next_file_id: u64,
    runs: u32,
}

impl CaseContext {
    /// Create an empty case rooted at `case_directory`.
    #[must_use]
    pub fn new(case_directory: impl Into<PathBuf>) -> Self {
        Self {
            case_directory: case_directory.into(),
            strings: StringTable::new(),
            values: ValueTable::new(),
            tree: NamespaceTree::new(),
            evidence: Vec::new(),
            next_file_id: FIRST_FILE_ID,
            runs: 0,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.case_directory
    }

    #[must_use]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    #[must_use]
    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut ValueTable {
        &mut self.values
    }

    #[must_use]
    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut NamespaceTree {
        &mut self.tree
    }

    #[must_use]
    pub fn evidence(&self) -> &[EvidenceRecord] {
        &self.evidence
    }

    /// Number of completed processing runs.
    #[must_use]
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Whether `path` was already added to this case by an earlier run.
    #[must_use]
    pub fn contains_evidence(&self, path: &Path) -> bool {
        self.evidence.iter().any(|record| record.path == path)
    }

    /// Reserve the next evidence file id.
    pub fn allocate_file(&mut self) -> FileId {
        let id = FileId(self.next_file_id);
        self.next_file_id = self.next_file_id.saturating_add(1);
        id
    }

    // =========================================================================
    // POPULATION (called by acquirers)
    // =========================================================================

    /// Resolve a key path from the root, creating missing keys.
    pub fn insert_key<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId, CaseError> {
        let labels: Vec<_> = path
            .iter()
            .map(|segment| self.strings.intern_str(segment.as_ref()))
            .collect();
        self.tree.resolve_path(&labels)
    }

    /// Attach a value to `key`.
    ///
    /// The value name becomes a child node of the key; raw and text content
    /// are interned in the string table. Identical content under the same
    /// name and type resolves to the existing value id.
    pub fn insert_value(
        &mut self,
        key: NodeId,
        name: &str,
        raw: &[u8],
        text: &str,
        type_tag: &str,
        file: FileId,
    ) -> Result<ValueId, CaseError> {
        let label = self.strings.intern_str(name);
        let node = self.tree.resolve_or_create(key, label)?;
        let value_key = ValueKey {
            node,
            ascii: self.strings.intern_str(text),
            raw: self.strings.intern(raw),
            type_tag: type_tag.to_string(),
        };
        Ok(self.values.intern(value_key, file))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Rebuild the session caches from the relational store.
    ///
    /// Each stored edge is reconciled against the node arena and keyed by
    /// `(parent, label)`; each attribute row is keyed by
    /// `(node, ascii, raw, type)`. The child index is rebuilt from the edges.
    ///
    /// Rows left by a run that committed but never checkpointed are adopted,
    /// together with the strings that run committed. A row referencing a
    /// string that neither the snapshot nor the store holds fails with
    /// `CaseError::StaleSnapshot`. Id allocators move past everything found
    /// in the store.
    pub fn rehydrate(&mut self, store: &RelationalStore) -> Result<RehydrateStats, CaseError> {
        let mut stats = RehydrateStats::default();

        let known = StringId(self.strings.len() as u64);
        for (id, content) in store.load_strings_from(known)? {
            self.strings.adopt(id, &content)?;
            stats.adopted_strings += 1;
        }
        if stats.adopted_strings > 0 {
            tracing::warn!(
                strings = stats.adopted_strings,
                "adopted strings missing from snapshot"
            );
        }

        let edges = store.load_all_edges()?;
        for &edge in &edges {
            self.require_string(edge.label, "node", edge.id.0)?;
            if self.tree.rehydrate_edge(edge)? == EdgeReconcile::Adopted {
                tracing::warn!(
                    node = edge.id.0,
                    parent = edge.parent.0,
                    "adopted node missing from snapshot"
                );
                stats.adopted += 1;
            }
        }
        stats.edges = edges.len();
        self.tree.rebuild_child_index(edges);

        for row in store.load_all_attributes()? {
            self.require_string(row.raw, "value", row.id.0)?;
            self.require_string(row.ascii, "value", row.id.0)?;
            self.values.rehydrate_row(&row);
            if row.file.0 >= self.next_file_id {
                self.next_file_id = row.file.0.saturating_add(1);
            }
            stats.attributes += 1;
        }

        self.tree.mark_stored();
        Ok(stats)
    }

    fn require_string(&self, id: StringId, kind: &str, owner: u64) -> Result<(), CaseError> {
        if self.strings.get(id).is_none() {
            return Err(CaseError::StaleSnapshot(format!(
                "{} {} references unknown string {}",
                kind, owner, id.0
            )));
        }
        Ok(())
    }

    /// Append accepted evidence for the current run.
    pub(crate) fn record_evidence(&mut self, outcomes: &[EvidenceOutcome]) {
        let run = self.runs.saturating_add(1);
        self.evidence
            .extend(outcomes.iter().map(|outcome| EvidenceRecord {
                file: outcome.file,
                path: outcome.path.clone(),
                artifact_types: outcome.artifact_types.clone(),
                run,
            }));
    }

    /// Drop working caches and close out the run before serialization.
    pub(crate) fn prepare_checkpoint(&mut self) {
        self.tree.clear_session_cache();
        self.values.clear_cache();
        self.runs = self.runs.saturating_add(1);
    }

    /// Point the case at the directory it was actually opened from.
    pub(crate) fn relocate(&mut self, case_directory: &Path) {
        if self.case_directory != case_directory {
            tracing::warn!(
                recorded = %self.case_directory.display(),
                opened = %case_directory.display(),
                "case directory moved since last checkpoint"
            );
            self.case_directory = case_directory.to_path_buf();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
