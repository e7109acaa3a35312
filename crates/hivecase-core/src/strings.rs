//! # String Table
//!
//! Content-addressed interning of labels and value renderings.
//!
//! Every distinct byte sequence gets exactly one `StringId`, assigned in
//! first-seen order. Key names, value names, text renderings and raw value
//! content all share this table, so identical content seen in two evidence
//! sources resolves to the same id.
//!
//! Only the entry list is serialized; the reverse index is rebuilt on load.

use crate::{CaseError, StringId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interning table mapping content to stable ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StringTableRepr", into = "StringTableRepr")]
pub struct StringTable {
    /// Content indexed by `StringId.0`.
    entries: Vec<Vec<u8>>,
    /// Reverse lookup: content -> id.
    index: BTreeMap<Vec<u8>, StringId>,
}

#[derive(Serialize, Deserialize)]
struct StringTableRepr {
    entries: Vec<Vec<u8>>,
}

impl From<StringTableRepr> for StringTable {
    fn from(repr: StringTableRepr) -> Self {
        let index = repr
            .entries
            .iter()
            .enumerate()
            .map(|(i, bytes)| (bytes.clone(), StringId(i as u64)))
            .collect();
        Self {
            entries: repr.entries,
            index,
        }
    }
}

impl From<StringTable> for StringTableRepr {
    fn from(table: StringTable) -> Self {
        Self {
            entries: table.entries,
        }
    }
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern raw content, returning the existing id if it was seen before.
    pub fn intern(&mut self, content: &[u8]) -> StringId {
        if let Some(&id) = self.index.get(content) {
            return id;
        }
        let id = StringId(self.entries.len() as u64);
        self.entries.push(content.to_vec());
        self.index.insert(content.to_vec(), id);
        id
    }

    /// Intern a text label.
    pub fn intern_str(&mut self, s: &str) -> StringId {
        self.intern(s.as_bytes())
    }

    /// Look up the id of already-interned content without inserting.
    #[must_use]
    pub fn find(&self, content: &[u8]) -> Option<StringId> {
        self.index.get(content).copied()
    }

    /// Content for an id.
    #[must_use]
    pub fn get(&self, id: StringId) -> Option<&[u8]> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(Vec::as_slice)
    }

    /// Entries with an id of at least `from`, in id order.
    pub fn entries_from(&self, from: usize) -> impl Iterator<Item = (StringId, &[u8])> {
        self.entries
            .iter()
            .enumerate()
            .skip(from)
            .map(|(i, bytes)| (StringId(i as u64), bytes.as_slice()))
    }

    /// Append an entry read back from the store at its stored id.
    ///
    /// The id must be the next free one and the content must be new,
    /// otherwise the table has diverged from the store.
    pub(crate) fn adopt(&mut self, id: StringId, content: &[u8]) -> Result<(), CaseError> {
        let next = self.entries.len() as u64;
        if id.0 != next {
            return Err(CaseError::StaleSnapshot(format!(
                "stored string {} does not follow string table of length {}",
                id.0, next
            )));
        }
        if let Some(existing) = self.index.get(content) {
            return Err(CaseError::StaleSnapshot(format!(
                "stored string {} repeats string {}",
                id.0, existing.0
            )));
        }
        self.entries.push(content.to_vec());
        self.index.insert(content.to_vec(), id);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
