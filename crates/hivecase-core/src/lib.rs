//! # hivecase-core
//!
//! Incremental, resumable indexer for forensic registry cases.
//!
//! A case directory holds two relational tables (tree edges and attribute
//! rows) and one snapshot of the in-memory `CaseContext`. Each processing
//! run acquires a list of evidence sources, deduplicates their keys and
//! values against everything the case already contains, commits the new
//! rows and checkpoints the context so a later run can extend it.
//!
//! ## Layout
//!
//! - `types`: identifiers, records, classification and `CaseError`
//! - `strings`, `values`, `tree`: the dedup tables owned by a case
//! - `case`: the `CaseContext` aggregate
//! - `storage`: redb-backed node and attribute tables
//! - `formats`: the case snapshot format
//! - `acquire`, `sink`: collaborator seams (acquirers, progress, evidence)
//! - `orchestrator`: the run state machine
//! - `verify`: snapshot/store consistency checks
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-writer: one `CaseBuilder` per case directory
//! - Deterministic: `BTreeMap`/`BTreeSet` only, sequential id allocation
//! - Hive decoding happens outside this crate; acquirers consume exports

// =============================================================================
// MODULES
// =============================================================================

pub mod acquire;
pub mod case;
pub mod formats;
pub mod orchestrator;
pub mod primitives;
pub mod sink;
pub mod storage;
pub mod strings;
pub mod tree;
pub mod types;
pub mod values;
pub mod verify;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ArtifactType, CaseError, Classification, EvidenceOutcome, EvidenceSource, FileId, KeyValue,
    NodeId, StringId, TreeNode, ValueId, ValueKey,
};

// =============================================================================
// RE-EXPORTS: Case State
// =============================================================================

pub use case::{CaseContext, EvidenceRecord, RehydrateStats};
pub use storage::{CommitStats, RelationalStore};
pub use strings::StringTable;
pub use tree::{EdgeReconcile, NamespaceStore, NamespaceTree};
pub use values::ValueTable;
pub use verify::{ConsistencyReport, verify_case};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    SnapshotHeader, read_snapshot, snapshot_from_bytes, snapshot_path, snapshot_to_bytes,
    write_snapshot,
};

// =============================================================================
// RE-EXPORTS: Run Orchestration
// =============================================================================

pub use acquire::{Acquirer, ExportAcquirer, ExportDocument, ExportKey, ExportValue};
pub use orchestrator::{CaseBuilder, InitMode, Phase, RunReport, RunRequest};
pub use sink::{EvidenceLedger, EvidenceSink, NullProgress, ProgressSink, TracingProgress};
