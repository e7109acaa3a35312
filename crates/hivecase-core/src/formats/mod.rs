//! # Formats Module
//!
//! On-disk formats owned by the core. File naming lives in `primitives`.

mod snapshot;

pub use snapshot::{
    SnapshotHeader, read_snapshot, snapshot_from_bytes, snapshot_path, snapshot_to_bytes,
    write_snapshot,
};
