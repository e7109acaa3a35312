//! # Case Snapshot Format
//!
//! Binary checkpoint of a whole `CaseContext`.
//!
//! Format: Header (37 bytes) + postcard-serialized case data.
//! - 4 bytes: Magic ("HVCS")
//! - 1 byte: Version
//! - 32 bytes: BLAKE3 digest of the payload
//!
//! ## Validation
//!
//! Size limits, magic, version and digest are all checked before the payload
//! is handed to postcard, so a truncated or foreign file is rejected without
//! attempting to decode it.
//!
//! ## Atomicity
//!
//! `write_snapshot` writes to a hidden sibling file, syncs it and renames it
//! over the target. A failed checkpoint leaves either the previous snapshot
//! or no snapshot, never a partial one.

use crate::case::CaseContext;
use crate::primitives::{
    DIGEST_LEN, FORMAT_VERSION, HEADER_LEN, MAGIC_BYTES, MAX_SNAPSHOT_SIZE, SNAPSHOT_FILE,
};
use crate::CaseError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all case data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub digest: [u8; DIGEST_LEN],
}

impl SnapshotHeader {
    /// Create a header for `payload` with the current format version.
    #[must_use]
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
            digest: *blake3::hash(payload).as_bytes(),
        }
    }

    /// Validate magic and version.
    pub fn validate(&self) -> Result<(), CaseError> {
        if &self.magic != MAGIC_BYTES {
            return Err(CaseError::Serialization(
                "Invalid snapshot magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(CaseError::Serialization(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Check the payload against the recorded digest.
    pub fn verify_payload(&self, payload: &[u8]) -> Result<(), CaseError> {
        if blake3::hash(payload).as_bytes() != &self.digest {
            return Err(CaseError::Serialization(
                "Snapshot digest mismatch".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5..].copy_from_slice(&self.digest);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaseError> {
        if bytes.len() < HEADER_LEN {
            return Err(CaseError::Serialization(
                "Snapshot header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[5..HEADER_LEN]);
        Ok(Self {
            magic,
            version: bytes[4],
            digest,
        })
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a case to bytes (header + payload). No file I/O.
pub fn snapshot_to_bytes(case: &CaseContext) -> Result<Vec<u8>, CaseError> {
    let payload =
        postcard::to_stdvec(case).map_err(|e| CaseError::Serialization(e.to_string()))?;
    let header = SnapshotHeader::for_payload(&payload);

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a case from bytes. No file I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<CaseContext, CaseError> {
    if bytes.len() < HEADER_LEN {
        return Err(CaseError::Serialization(format!(
            "Snapshot too short: minimum {} bytes required",
            HEADER_LEN
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(CaseError::Serialization(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;
    let payload = &bytes[HEADER_LEN..];
    header.verify_payload(payload)?;

    postcard::from_bytes(payload).map_err(|e| {
        CaseError::Serialization(format!("Failed to deserialize case snapshot: {}", e))
    })
}

// =============================================================================
// FILE I/O
// =============================================================================

/// Path of the snapshot inside a case directory.
#[must_use]
pub fn snapshot_path(case_directory: &Path) -> PathBuf {
    case_directory.join(SNAPSHOT_FILE)
}

fn temp_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(SNAPSHOT_FILE);
    target
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"))
}

fn publish(tmp: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, target)
}

/// Write the case snapshot atomically into its case directory.
pub fn write_snapshot(case: &CaseContext) -> Result<PathBuf, CaseError> {
    let target = snapshot_path(case.directory());
    let tmp = temp_path(&target);
    let data = snapshot_to_bytes(case)?;

    if let Err(e) = publish(&tmp, &target, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(CaseError::Io(format!(
            "write snapshot {}: {}",
            target.display(),
            e
        )));
    }

    tracing::debug!(path = %target.display(), bytes = data.len(), "snapshot written");
    Ok(target)
}

/// Read and validate the snapshot of a case directory.
pub fn read_snapshot(case_directory: &Path) -> Result<CaseContext, CaseError> {
    let path = snapshot_path(case_directory);
    if !path.is_file() {
        return Err(CaseError::CaseNotFound(case_directory.to_path_buf()));
    }
    let metadata = fs::metadata(&path)
        .map_err(|e| CaseError::Io(format!("stat {}: {}", path.display(), e)))?;
    if metadata.len() > MAX_SNAPSHOT_SIZE as u64 {
        return Err(CaseError::Serialization(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    let bytes =
        fs::read(&path).map_err(|e| CaseError::Io(format!("read {}: {}", path.display(), e)))?;
    snapshot_from_bytes(&bytes)
}

// =============================================================================
// TESTS
// =============================================================================
