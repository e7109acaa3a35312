//! # Case Primitives
//!
//! Fixed constants for the hivecase indexer: on-disk names, the snapshot
//! header, id sentinels and input limits.
//!
//! These are compiled into the binary and never change at runtime. Changing
//! any of the file names or the snapshot layout requires a `FORMAT_VERSION`
//! bump.

use crate::NodeId;

/// Parent id of every top-level key in a namespace tree.
///
/// Real node ids are allocated from [`FIRST_NODE_ID`] upward, so the root
/// sentinel can never collide with an allocated node.
pub const ROOT_PARENT: NodeId = NodeId(0);

/// First node id handed out by a fresh namespace tree.
pub const FIRST_NODE_ID: u64 = 1;

/// First attribute row id handed out by a fresh value table.
pub const FIRST_VALUE_ID: u64 = 1;

/// First evidence file id handed out by a fresh case.
pub const FIRST_FILE_ID: u64 = 1;

// =============================================================================
// CASE DIRECTORY LAYOUT
// =============================================================================

/// Attribute database (table `keyvalues`).
pub const NAMEDATA_DB: &str = "namedata.db";

/// Hierarchy database (table `treenodes`).
pub const TREENODES_DB: &str = "treenodes.db";

/// Case snapshot written at the end of every successful run.
pub const SNAPSHOT_FILE: &str = "caseobj.snapshot";

/// Optional per-case configuration file read by the binary.
pub const CONFIG_FILE: &str = "hivecase.toml";

// =============================================================================
// SNAPSHOT HEADER
// =============================================================================

/// Magic bytes for the case snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"HVCS";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to `CaseContext` serialization.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the BLAKE3 payload digest stored in the header.
pub const DIGEST_LEN: usize = 32;

/// Total header length: magic + version + digest.
pub const HEADER_LEN: usize = 4 + 1 + DIGEST_LEN;

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum snapshot file size accepted on load (1 GiB).
///
/// Checked before the payload is deserialized.
pub const MAX_SNAPSHOT_SIZE: usize = 1024 * 1024 * 1024;

/// Default maximum size of a single export document (256 MiB).
pub const DEFAULT_MAX_EXPORT_BYTES: u64 = 256 * 1024 * 1024;

/// Maximum depth of a key path in an export document.
///
/// Registry key paths are bounded at 512 levels by the hive format.
pub const MAX_KEY_DEPTH: usize = 512;
