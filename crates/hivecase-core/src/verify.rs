//! # Case Verification
//!
//! Read-only comparison of a case snapshot against its relational store.
//!
//! A healthy case has every arena node stored as an edge (and nothing
//! more), every edge hanging off the root or another stored node, every
//! attribute row attached to a stored node, and a child index equal to the
//! one derived from the stored edges.

use crate::case::CaseContext;
use crate::primitives::ROOT_PARENT;
use crate::storage::RelationalStore;
use crate::tree::NamespaceStore;
use crate::{CaseError, NodeId, ValueId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Findings of `verify_case`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub snapshot_nodes: usize,
    pub stored_edges: usize,
    pub stored_attributes: usize,
    /// Nodes in the snapshot with no stored edge.
    pub missing_from_store: Vec<NodeId>,
    /// Stored edges unknown to the snapshot (committed, never checkpointed).
    pub uncheckpointed: Vec<NodeId>,
    /// Stored edges whose (parent, label) differs from the snapshot.
    pub conflicting: Vec<NodeId>,
    /// Stored edges whose parent is neither the root nor a stored node.
    pub dangling_parents: Vec<NodeId>,
    /// Attribute rows attached to a node that has no stored edge.
    pub orphan_attributes: Vec<ValueId>,
    pub child_index_matches: bool,
}

impl ConsistencyReport {
    /// Whether the snapshot and the store describe the same case.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.missing_from_store.is_empty()
            && self.uncheckpointed.is_empty()
            && self.conflicting.is_empty()
            && self.dangling_parents.is_empty()
            && self.orphan_attributes.is_empty()
            && self.child_index_matches
    }
}

/// Compare a snapshot-loaded case with its store.
///
/// `case` should be the context as read from the snapshot, before
/// rehydration, so that the child index under test is the persisted one.
pub fn verify_case(
    case: &CaseContext,
    store: &RelationalStore,
) -> Result<ConsistencyReport, CaseError> {
    let edges = store.load_all_edges()?;
    let attributes = store.load_all_attributes()?;
    let tree = case.tree();

    let mut report = ConsistencyReport {
        snapshot_nodes: tree.node_count(),
        stored_edges: edges.len(),
        stored_attributes: attributes.len(),
        ..ConsistencyReport::default()
    };

    let stored: BTreeSet<NodeId> = edges.iter().map(|edge| edge.id).collect();
    let mut derived: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

    for edge in &edges {
        match tree.lookup_by_id(edge.id) {
            Some(known) if known.key() == edge.key() => {}
            Some(_) => report.conflicting.push(edge.id),
            None => report.uncheckpointed.push(edge.id),
        }
        if edge.parent != ROOT_PARENT && !stored.contains(&edge.parent) {
            report.dangling_parents.push(edge.id);
        }
        derived.entry(edge.parent).or_default().insert(edge.id);
    }

    report.missing_from_store = tree
        .nodes()
        .filter(|node| !stored.contains(&node.id))
        .map(|node| node.id)
        .collect();

    report.orphan_attributes = attributes
        .iter()
        .filter(|row| !stored.contains(&row.node))
        .map(|row| row.id)
        .collect();

    report.child_index_matches = tree.child_index() == &derived;

    if !report.is_consistent() {
        tracing::warn!(
            missing = report.missing_from_store.len(),
            uncheckpointed = report.uncheckpointed.len(),
            conflicting = report.conflicting.len(),
            dangling = report.dangling_parents.len(),
            orphans = report.orphan_attributes.len(),
            child_index = report.child_index_matches,
            "case is inconsistent"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::read_snapshot;
    use crate::{
        CaseBuilder, EvidenceLedger, ExportAcquirer, InitMode, NullProgress, RunRequest,
        StringId, TreeNode,
    };
    use std::path::Path;
    use tempfile::tempdir;

    fn build_case(case_dir: &Path) {
        let evidence = tempdir().expect("temp dir");
        let export = evidence.path().join("system.json");
        std::fs::write(
            &export,
            r#"{"artifact_type":"SYSTEM","keys":[{"path":["Select"],"values":[{"name":"Current","type":"REG_DWORD","raw":[1,0,0,0],"text":"1"}]}]}"#,
        )
        .expect("write");

        let mut progress = NullProgress;
        CaseBuilder::new(&mut progress)
            .run(
                &RunRequest {
                    case_directory: case_dir.to_path_buf(),
                    mode: InitMode::Fresh,
                    evidence: vec![export],
                },
                &mut ExportAcquirer::default(),
                &mut EvidenceLedger,
            )
            .expect("run");
    }

    #[test]
    fn fresh_case_is_consistent() {
        let case_dir = tempdir().expect("temp dir");
        build_case(case_dir.path());

        let case = read_snapshot(case_dir.path()).expect("snapshot");
        let store = RelationalStore::create_schema(case_dir.path()).expect("store");
        let report = verify_case(&case, &store).expect("verify");

        assert!(report.is_consistent(), "{report:?}");
        assert_eq!(report.snapshot_nodes, 2);
        assert_eq!(report.stored_edges, 2);
        assert_eq!(report.stored_attributes, 1);
    }

    #[test]
    fn foreign_edge_is_reported() {
        let case_dir = tempdir().expect("temp dir");
        build_case(case_dir.path());

        let case = read_snapshot(case_dir.path()).expect("snapshot");
        let store = RelationalStore::create_schema(case_dir.path()).expect("store");
        store
            .commit_tree_edges(&[TreeNode::new(NodeId(40), NodeId(39), StringId(0))])
            .expect("commit");

        let report = verify_case(&case, &store).expect("verify");
        assert!(!report.is_consistent());
        assert_eq!(report.uncheckpointed, vec![NodeId(40)]);
        assert_eq!(report.dangling_parents, vec![NodeId(40)]);
        assert!(!report.child_index_matches);
    }
}
