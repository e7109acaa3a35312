//! # Value Table
//!
//! Deduplication of attribute values by composite content key.
//!
//! A `ValueKey` (node, text rendering, raw content, type) maps to exactly one
//! `ValueId`, and that id is the primary key of the attribute row. The first
//! time a key is interned a pending `KeyValue` row is queued for the next
//! commit; later sightings, from any evidence source, reuse the id.
//!
//! The key map is a working cache: it is not written to the snapshot but
//! rebuilt from the attribute table on resume (see `rehydrate_row`). Only the
//! id allocator survives a checkpoint.

use crate::primitives::FIRST_VALUE_ID;
use crate::{FileId, KeyValue, ValueId, ValueKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value dedup table with a queue of rows awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueTable {
    /// Content key -> value id.
    #[serde(skip)]
    keys: BTreeMap<ValueKey, ValueId>,
    /// Rows created since the last commit.
    #[serde(skip)]
    pending: Vec<KeyValue>,
    /// Next id to hand out.
    next_id: u64,
}

impl Default for ValueTable {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
            pending: Vec::new(),
            next_id: FIRST_VALUE_ID,
        }
    }
}

impl ValueTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `key`, allocating one and queueing a row on first sight.
    ///
    /// `file` is recorded on the row only when the value is new; a repeat from
    /// another evidence source keeps the original row.
    pub fn intern(&mut self, key: ValueKey, file: FileId) -> ValueId {
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = ValueId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(KeyValue {
            id,
            node: key.node,
            file,
            raw: key.raw,
            ascii: key.ascii,
            type_tag: key.type_tag.clone(),
        });
        self.keys.insert(key, id);
        id
    }

    /// Register a row loaded from the attribute table.
    ///
    /// Advances the allocator past the row id so ids are never reused, even
    /// if the snapshot predates the row.
    pub fn rehydrate_row(&mut self, row: &KeyValue) {
        self.keys.insert(row.value_key(), row.id);
        if row.id.0 >= self.next_id {
            self.next_id = row.id.0.saturating_add(1);
        }
    }

    #[must_use]
    pub fn get(&self, key: &ValueKey) -> Option<ValueId> {
        self.keys.get(key).copied()
    }

    /// Drain the rows queued since the last commit, in allocation order.
    pub fn take_pending(&mut self) -> Vec<KeyValue> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct values known to the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Iterate the cache in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&ValueKey, ValueId)> {
        self.keys.iter().map(|(k, v)| (k, *v))
    }

    /// Drop the key cache before a checkpoint.
    pub(crate) fn clear_cache(&mut self) {
        self.keys.clear();
    }
}
