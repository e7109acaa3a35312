//! # redb-backed Relational Store
//!
//! Durable node and attribute tables for a case, kept in two redb databases
//! inside the case directory:
//!
//! - `treenodes.db`: `treenodes` (surrogate row id -> edge) and `treeindex`
//!   (`(node, parent, label)` -> row id). The index doubles as the
//!   uniqueness constraint on `node`. `strings` holds the string table
//!   entries referenced by committed rows, so a run that commits but never
//!   checkpoints can still be resumed.
//! - `namedata.db`: `keyvalues` (value id -> row) and `keyvalindex`
//!   (`(node, file, value id)`).
//!
//! Every commit runs in a single write transaction, so a batch is either
//! fully applied or not at all. Re-committing an edge or row that is already
//! present is a counted no-op, which makes commits safe to repeat after a
//! resume.
//!
//! `open_read_only` opens an existing case for inspection without creating
//! or modifying anything.

use crate::{CaseError, FileId, KeyValue, NodeId, StringId, TreeNode, ValueId};
use crate::primitives::{NAMEDATA_DB, TREENODES_DB};
use redb::{
    Database, ReadOnlyDatabase, ReadTransaction, ReadableDatabase, ReadableTable,
    ReadableTableMetadata, TableDefinition,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node table: row id -> (node, parent, label)
const TREENODES: TableDefinition<u64, (u64, u64, u64)> = TableDefinition::new("treenodes");

/// Node index: (node, parent, label) -> row id
const TREE_INDEX: TableDefinition<(u64, u64, u64), u64> = TableDefinition::new("treeindex");

/// Tree metadata: key string -> value u64
const TREE_METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// String table: string id -> content
const STRINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("strings");

/// Attribute table: value id -> serialized AttributeRow
const KEYVALUES: TableDefinition<u64, &[u8]> = TableDefinition::new("keyvalues");

/// Attribute index: (node, file, value id) -> ()
const KEYVAL_INDEX: TableDefinition<(u64, u64, u64), ()> = TableDefinition::new("keyvalindex");

const NEXT_ROW_ID: &str = "next_row_id";

/// Attribute columns other than the key and the indexed node.
#[derive(Debug, Serialize, Deserialize)]
struct AttributeRow {
    node: u64,
    file: u64,
    raw: u64,
    ascii: u64,
    type_tag: String,
}

/// Outcome of an idempotent batch commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Rows written by this commit.
    pub inserted: usize,
    /// Rows that were already present and left untouched.
    pub duplicates: usize,
}

fn store_err<E: std::fmt::Display>(e: E) -> CaseError {
    CaseError::Store(e.to_string())
}

/// A database handle, writable or opened for inspection only.
enum Handle {
    Write(Database),
    Read(ReadOnlyDatabase),
}

impl Handle {
    fn begin_read(&self) -> Result<ReadTransaction, CaseError> {
        match self {
            Handle::Write(db) => db.begin_read().map_err(store_err),
            Handle::Read(db) => db.begin_read().map_err(store_err),
        }
    }

    fn writer(&self) -> Result<&Database, CaseError> {
        match self {
            Handle::Write(db) => Ok(db),
            Handle::Read(_) => Err(CaseError::Store("store is open read-only".to_string())),
        }
    }
}

/// The relational store of one case directory.
pub struct RelationalStore {
    tree_db: Handle,
    name_db: Handle,
    directory: PathBuf,
}

impl std::fmt::Debug for RelationalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalStore")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl RelationalStore {
    /// Open the case databases, creating files and tables that are missing.
    ///
    /// Calling this against an already initialized directory is a no-op
    /// apart from opening the handles.
    pub fn create_schema(case_directory: impl AsRef<Path>) -> Result<Self, CaseError> {
        let directory = case_directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)
            .map_err(|e| CaseError::Io(format!("create {}: {}", directory.display(), e)))?;

        let tree_db = Database::create(directory.join(TREENODES_DB)).map_err(store_err)?;
        {
            let write_txn = tree_db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(TREENODES).map_err(store_err)?;
            let _ = write_txn.open_table(TREE_INDEX).map_err(store_err)?;
            let _ = write_txn.open_table(TREE_METADATA).map_err(store_err)?;
            let _ = write_txn.open_table(STRINGS).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        let name_db = Database::create(directory.join(NAMEDATA_DB)).map_err(store_err)?;
        {
            let write_txn = name_db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(KEYVALUES).map_err(store_err)?;
            let _ = write_txn.open_table(KEYVAL_INDEX).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        Ok(Self {
            tree_db: Handle::Write(tree_db),
            name_db: Handle::Write(name_db),
            directory,
        })
    }

    /// Open the databases of an existing case without creating anything.
    ///
    /// Missing database files are `CaseError::CaseNotFound`. Every commit
    /// through the returned store fails.
    pub fn open_read_only(case_directory: impl AsRef<Path>) -> Result<Self, CaseError> {
        let directory = case_directory.as_ref().to_path_buf();
        let tree_path = directory.join(TREENODES_DB);
        let name_path = directory.join(NAMEDATA_DB);
        if !tree_path.is_file() || !name_path.is_file() {
            return Err(CaseError::CaseNotFound(directory));
        }

        let tree_db = ReadOnlyDatabase::open(tree_path).map_err(store_err)?;
        let name_db = ReadOnlyDatabase::open(name_path).map_err(store_err)?;
        Ok(Self {
            tree_db: Handle::Read(tree_db),
            name_db: Handle::Read(name_db),
            directory,
        })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Insert tree edges in one transaction.
    ///
    /// An edge whose node id is already stored with the same parent and label
    /// is skipped. The same node id with a different parent or label is an
    /// invariant violation: the transaction is abandoned and
    /// `CaseError::ConflictingNode` returned.
    pub fn commit_tree_edges(&self, edges: &[TreeNode]) -> Result<CommitStats, CaseError> {
        let mut stats = CommitStats::default();
        if edges.is_empty() {
            return Ok(stats);
        }

        let write_txn = self.tree_db.writer()?.begin_write().map_err(store_err)?;
        {
            let mut nodes_table = write_txn.open_table(TREENODES).map_err(store_err)?;
            let mut index_table = write_txn.open_table(TREE_INDEX).map_err(store_err)?;
            let mut meta_table = write_txn.open_table(TREE_METADATA).map_err(store_err)?;

            let mut next_row_id = meta_table
                .get(NEXT_ROW_ID)
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(1);

            for edge in edges {
                let stored = {
                    let mut range = index_table
                        .range((edge.id.0, 0u64, 0u64)..=(edge.id.0, u64::MAX, u64::MAX))
                        .map_err(store_err)?;
                    match range.next() {
                        Some(entry) => {
                            let (key, _) = entry.map_err(store_err)?;
                            Some(key.value())
                        }
                        None => None,
                    }
                };

                match stored {
                    Some((_, parent, label)) if parent == edge.parent.0 && label == edge.label.0 => {
                        stats.duplicates += 1;
                    }
                    Some((_, parent, label)) => {
                        return Err(CaseError::ConflictingNode {
                            id: edge.id,
                            stored_parent: NodeId(parent),
                            stored_label: StringId(label),
                            parent: edge.parent,
                            label: edge.label,
                        });
                    }
                    None => {
                        let row = (edge.id.0, edge.parent.0, edge.label.0);
                        nodes_table.insert(next_row_id, row).map_err(store_err)?;
                        index_table.insert(row, next_row_id).map_err(store_err)?;
                        next_row_id = next_row_id.saturating_add(1);
                        stats.inserted += 1;
                    }
                }
            }

            meta_table
                .insert(NEXT_ROW_ID, next_row_id)
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;

        Ok(stats)
    }

    /// Insert attribute rows in one transaction.
    ///
    /// A row whose value id is already stored is skipped.
    pub fn commit_attributes(&self, rows: &[KeyValue]) -> Result<CommitStats, CaseError> {
        let mut stats = CommitStats::default();
        if rows.is_empty() {
            return Ok(stats);
        }

        let write_txn = self.name_db.writer()?.begin_write().map_err(store_err)?;
        {
            let mut values_table = write_txn.open_table(KEYVALUES).map_err(store_err)?;
            let mut index_table = write_txn.open_table(KEYVAL_INDEX).map_err(store_err)?;

            for row in rows {
                if values_table.get(row.id.0).map_err(store_err)?.is_some() {
                    stats.duplicates += 1;
                    continue;
                }
                let bytes = postcard::to_allocvec(&AttributeRow {
                    node: row.node.0,
                    file: row.file.0,
                    raw: row.raw.0,
                    ascii: row.ascii.0,
                    type_tag: row.type_tag.clone(),
                })
                .map_err(|e| CaseError::Serialization(e.to_string()))?;

                values_table
                    .insert(row.id.0, bytes.as_slice())
                    .map_err(store_err)?;
                index_table
                    .insert((row.node.0, row.file.0, row.id.0), ())
                    .map_err(store_err)?;
                stats.inserted += 1;
            }
        }
        write_txn.commit().map_err(store_err)?;

        Ok(stats)
    }

    /// Insert string table entries in one transaction.
    ///
    /// An id already stored with the same content is skipped; with different
    /// content the transaction is abandoned and `CaseError::StaleSnapshot`
    /// returned.
    pub fn commit_strings<'s, I>(&self, entries: I) -> Result<CommitStats, CaseError>
    where
        I: IntoIterator<Item = (StringId, &'s [u8])>,
    {
        let mut stats = CommitStats::default();
        let write_txn = self.tree_db.writer()?.begin_write().map_err(store_err)?;
        {
            let mut strings_table = write_txn.open_table(STRINGS).map_err(store_err)?;
            for (id, content) in entries {
                let same = match strings_table.get(id.0).map_err(store_err)? {
                    Some(stored) => Some(stored.value() == content),
                    None => None,
                };
                match same {
                    Some(true) => stats.duplicates += 1,
                    Some(false) => {
                        return Err(CaseError::StaleSnapshot(format!(
                            "string {} is stored with different content",
                            id.0
                        )));
                    }
                    None => {
                        strings_table.insert(id.0, content).map_err(store_err)?;
                        stats.inserted += 1;
                    }
                }
            }
        }
        write_txn.commit().map_err(store_err)?;

        Ok(stats)
    }

    /// Stored strings with an id of at least `from`, in id order.
    pub fn load_strings_from(&self, from: StringId) -> Result<Vec<(StringId, Vec<u8>)>, CaseError> {
        let read_txn = self.tree_db.begin_read()?;
        let strings_table = read_txn.open_table(STRINGS).map_err(store_err)?;

        let mut strings = Vec::new();
        for entry in strings_table.range(from.0..).map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            strings.push((StringId(key.value()), value.value().to_vec()));
        }
        Ok(strings)
    }

    /// Remove every row from every table.
    ///
    /// Used to discard rows committed by a fresh run that never wrote its
    /// snapshot.
    pub fn clear(&self) -> Result<(), CaseError> {
        let write_txn = self.name_db.writer()?.begin_write().map_err(store_err)?;
        {
            let mut values_table = write_txn.open_table(KEYVALUES).map_err(store_err)?;
            values_table.retain(|_, _| false).map_err(store_err)?;
            let mut index_table = write_txn.open_table(KEYVAL_INDEX).map_err(store_err)?;
            index_table.retain(|_, _| false).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;

        let write_txn = self.tree_db.writer()?.begin_write().map_err(store_err)?;
        {
            let mut nodes_table = write_txn.open_table(TREENODES).map_err(store_err)?;
            nodes_table.retain(|_, _| false).map_err(store_err)?;
            let mut index_table = write_txn.open_table(TREE_INDEX).map_err(store_err)?;
            index_table.retain(|_, _| false).map_err(store_err)?;
            let mut meta_table = write_txn.open_table(TREE_METADATA).map_err(store_err)?;
            meta_table.retain(|_, _| false).map_err(store_err)?;
            let mut strings_table = write_txn.open_table(STRINGS).map_err(store_err)?;
            strings_table.retain(|_, _| false).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;

        Ok(())
    }

    /// All edges in row order.
    pub fn load_all_edges(&self) -> Result<Vec<TreeNode>, CaseError> {
        let read_txn = self.tree_db.begin_read()?;
        let nodes_table = read_txn.open_table(TREENODES).map_err(store_err)?;

        let mut edges = Vec::new();
        for entry in nodes_table.iter().map_err(store_err)? {
            let (_, value) = entry.map_err(store_err)?;
            let (node, parent, label) = value.value();
            edges.push(TreeNode::new(NodeId(node), NodeId(parent), StringId(label)));
        }
        Ok(edges)
    }

    /// All attribute rows in value id order.
    pub fn load_all_attributes(&self) -> Result<Vec<KeyValue>, CaseError> {
        let read_txn = self.name_db.begin_read()?;
        let values_table = read_txn.open_table(KEYVALUES).map_err(store_err)?;

        let mut rows = Vec::new();
        for entry in values_table.iter().map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            rows.push(decode_attribute(key.value(), value.value())?);
        }
        Ok(rows)
    }

    /// Attribute rows attached to one node, ordered by file then value id.
    pub fn attributes_for_node(&self, node: NodeId) -> Result<Vec<KeyValue>, CaseError> {
        let read_txn = self.name_db.begin_read()?;
        let index_table = read_txn.open_table(KEYVAL_INDEX).map_err(store_err)?;
        let values_table = read_txn.open_table(KEYVALUES).map_err(store_err)?;

        let mut rows = Vec::new();
        for entry in index_table
            .range((node.0, 0u64, 0u64)..=(node.0, u64::MAX, u64::MAX))
            .map_err(store_err)?
        {
            let (key, _) = entry.map_err(store_err)?;
            let (_, _, id) = key.value();
            if let Some(data) = values_table.get(id).map_err(store_err)? {
                rows.push(decode_attribute(id, data.value())?);
            }
        }
        Ok(rows)
    }

    /// Look up the stored edge for a node id.
    pub fn edge_for_node(&self, node: NodeId) -> Result<Option<TreeNode>, CaseError> {
        let read_txn = self.tree_db.begin_read()?;
        let index_table = read_txn.open_table(TREE_INDEX).map_err(store_err)?;

        let mut range = index_table
            .range((node.0, 0u64, 0u64)..=(node.0, u64::MAX, u64::MAX))
            .map_err(store_err)?;
        match range.next() {
            Some(entry) => {
                let (key, _) = entry.map_err(store_err)?;
                let (id, parent, label) = key.value();
                Ok(Some(TreeNode::new(NodeId(id), NodeId(parent), StringId(label))))
            }
            None => Ok(None),
        }
    }

    /// Rows in the node table.
    pub fn edge_count(&self) -> Result<usize, CaseError> {
        let read_txn = self.tree_db.begin_read()?;
        let table = read_txn.open_table(TREENODES).map_err(store_err)?;
        Ok(table.len().map_err(store_err)? as usize)
    }

    /// Rows in the string table.
    pub fn string_count(&self) -> Result<usize, CaseError> {
        let read_txn = self.tree_db.begin_read()?;
        let table = read_txn.open_table(STRINGS).map_err(store_err)?;
        Ok(table.len().map_err(store_err)? as usize)
    }

    /// Rows in the attribute table.
    pub fn attribute_count(&self) -> Result<usize, CaseError> {
        let read_txn = self.name_db.begin_read()?;
        let table = read_txn.open_table(KEYVALUES).map_err(store_err)?;
        Ok(table.len().map_err(store_err)? as usize)
    }
}

fn decode_attribute(id: u64, bytes: &[u8]) -> Result<KeyValue, CaseError> {
    let row: AttributeRow =
        postcard::from_bytes(bytes).map_err(|e| CaseError::Serialization(e.to_string()))?;
    Ok(KeyValue {
        id: ValueId(id),
        node: NodeId(row.node),
        file: FileId(row.file),
        raw: StringId(row.raw),
        ascii: StringId(row.ascii),
        type_tag: row.type_tag,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn edge(id: u64, parent: u64, label: u64) -> TreeNode {
        TreeNode::new(NodeId(id), NodeId(parent), StringId(label))
    }

    fn row(id: u64, node: u64, file: u64) -> KeyValue {
        KeyValue {
            id: ValueId(id),
            node: NodeId(node),
            file: FileId(file),
            raw: StringId(1),
            ascii: StringId(2),
            type_tag: "REG_SZ".to_string(),
        }
    }

    #[test]
    fn create_schema_is_idempotent() {
        let temp = tempdir().expect("temp dir");
        {
            let store = RelationalStore::create_schema(temp.path()).expect("first");
            store.commit_tree_edges(&[edge(1, 0, 5)]).expect("commit");
        }
        let store = RelationalStore::create_schema(temp.path()).expect("second");
        assert_eq!(store.edge_count().expect("count"), 1);
        assert!(temp.path().join(TREENODES_DB).exists());
        assert!(temp.path().join(NAMEDATA_DB).exists());
    }

    #[test]
    fn duplicate_edge_commit_keeps_one_row() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");

        let first = store.commit_tree_edges(&[edge(1, 0, 5)]).expect("first");
        let second = store.commit_tree_edges(&[edge(1, 0, 5)]).expect("second");

        assert_eq!(first, CommitStats { inserted: 1, duplicates: 0 });
        assert_eq!(second, CommitStats { inserted: 0, duplicates: 1 });
        assert_eq!(store.edge_count().expect("count"), 1);
    }

    #[test]
    fn conflicting_edge_aborts_whole_batch() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");
        store.commit_tree_edges(&[edge(1, 0, 5)]).expect("seed");

        let result = store.commit_tree_edges(&[edge(2, 0, 6), edge(1, 0, 7)]);

        assert!(matches!(result, Err(CaseError::ConflictingNode { .. })));
        assert_eq!(store.edge_count().expect("count"), 1);
        assert!(store.edge_for_node(NodeId(2)).expect("lookup").is_none());
    }

    #[test]
    fn edges_load_in_commit_order() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");
        store
            .commit_tree_edges(&[edge(3, 0, 1), edge(1, 0, 2)])
            .expect("commit");
        store.commit_tree_edges(&[edge(2, 1, 3)]).expect("commit");

        let edges = store.load_all_edges().expect("load");
        assert_eq!(edges, vec![edge(3, 0, 1), edge(1, 0, 2), edge(2, 1, 3)]);
    }

    #[test]
    fn attributes_round_trip_and_index_by_node() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");

        let stats = store
            .commit_attributes(&[row(1, 10, 1), row(2, 11, 1), row(3, 10, 2)])
            .expect("commit");
        assert_eq!(stats.inserted, 3);

        let all = store.load_all_attributes().expect("load");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], row(1, 10, 1));

        let for_node = store.attributes_for_node(NodeId(10)).expect("by node");
        let ids: Vec<u64> = for_node.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn duplicate_attribute_commit_is_noop() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");

        store.commit_attributes(&[row(1, 10, 1)]).expect("first");
        let stats = store.commit_attributes(&[row(1, 10, 1)]).expect("second");

        assert_eq!(stats, CommitStats { inserted: 0, duplicates: 1 });
        assert_eq!(store.attribute_count().expect("count"), 1);
    }

    #[test]
    fn strings_commit_once_and_load_from_offset() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");

        let entries = [(StringId(0), &b"Select"[..]), (StringId(1), &b"Current"[..])];
        let first = store.commit_strings(entries).expect("first");
        let second = store.commit_strings(entries).expect("second");

        assert_eq!(first, CommitStats { inserted: 2, duplicates: 0 });
        assert_eq!(second, CommitStats { inserted: 0, duplicates: 2 });
        assert_eq!(store.string_count().expect("count"), 2);
        assert_eq!(
            store.load_strings_from(StringId(1)).expect("load"),
            vec![(StringId(1), b"Current".to_vec())]
        );
    }

    #[test]
    fn string_with_new_content_is_stale() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");
        store
            .commit_strings([(StringId(0), &b"Select"[..])])
            .expect("seed");

        let result = store.commit_strings([(StringId(1), &b"Setup"[..]), (StringId(0), &b"Other"[..])]);

        assert!(matches!(result, Err(CaseError::StaleSnapshot(_))));
        assert_eq!(store.string_count().expect("count"), 1);
    }

    #[test]
    fn clear_empties_every_table() {
        let temp = tempdir().expect("temp dir");
        let store = RelationalStore::create_schema(temp.path()).expect("open");
        store.commit_tree_edges(&[edge(1, 0, 0)]).expect("edges");
        store.commit_attributes(&[row(1, 1, 1)]).expect("attrs");
        store
            .commit_strings([(StringId(0), &b"Select"[..])])
            .expect("strings");

        store.clear().expect("clear");

        assert_eq!(store.edge_count().expect("edges"), 0);
        assert_eq!(store.attribute_count().expect("attrs"), 0);
        assert_eq!(store.string_count().expect("strings"), 0);
        assert!(store.edge_for_node(NodeId(1)).expect("lookup").is_none());
        store.commit_tree_edges(&[edge(1, 0, 3)]).expect("reuse after clear");
    }

    #[test]
    fn read_only_store_reads_but_never_writes() {
        let temp = tempdir().expect("temp dir");
        {
            let store = RelationalStore::create_schema(temp.path()).expect("open");
            store.commit_tree_edges(&[edge(1, 0, 5)]).expect("edges");
        }

        let store = RelationalStore::open_read_only(temp.path()).expect("read only");
        assert_eq!(store.load_all_edges().expect("edges"), vec![edge(1, 0, 5)]);
        assert!(matches!(
            store.commit_tree_edges(&[edge(2, 0, 6)]),
            Err(CaseError::Store(_))
        ));
        assert_eq!(store.edge_count().expect("count"), 1);
    }

    #[test]
    fn read_only_open_creates_nothing() {
        let temp = tempdir().expect("temp dir");

        let result = RelationalStore::open_read_only(temp.path());

        assert!(matches!(result, Err(CaseError::CaseNotFound(_))));
        assert!(!temp.path().join(TREENODES_DB).exists());
        assert!(!temp.path().join(NAMEDATA_DB).exists());
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().expect("temp dir");
        {
            let store = RelationalStore::create_schema(temp.path()).expect("open");
            store.commit_tree_edges(&[edge(1, 0, 5)]).expect("edges");
            store.commit_attributes(&[row(1, 1, 1)]).expect("attrs");
        }
        let store = RelationalStore::create_schema(temp.path()).expect("reopen");
        store.commit_tree_edges(&[edge(2, 1, 6)]).expect("more");

        assert_eq!(store.load_all_edges().expect("edges").len(), 2);
        assert_eq!(store.load_all_attributes().expect("attrs").len(), 1);
    }
}
