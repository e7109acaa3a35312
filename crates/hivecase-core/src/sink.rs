//! # Sinks
//!
//! One-way outputs of a processing run.
//!
//! - `ProgressSink` receives stage labels. It cannot fail, and nothing the
//!   orchestrator does depends on it.
//! - `EvidenceSink` records the evidence that survived acquisition.

use crate::case::CaseContext;
use crate::{CaseError, EvidenceOutcome};

// =============================================================================
// PROGRESS
// =============================================================================

/// Receives human-readable stage labels.
pub trait ProgressSink {
    fn notify(&mut self, stage: &str);
}

/// Emits each stage label as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn notify(&mut self, stage: &str) {
        tracing::info!(target: "hivecase::progress", "{}", stage);
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn notify(&mut self, _stage: &str) {}
}

// =============================================================================
// EVIDENCE METADATA
// =============================================================================

/// Records evidence outcomes for a case.
pub trait EvidenceSink {
    fn write_evidence_record(
        &mut self,
        case: &mut CaseContext,
        outcomes: &[EvidenceOutcome],
    ) -> Result<(), CaseError>;
}

/// Stores evidence records inside the case itself, so they travel with the
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceLedger;

impl EvidenceSink for EvidenceLedger {
    fn write_evidence_record(
        &mut self,
        case: &mut CaseContext,
        outcomes: &[EvidenceOutcome],
    ) -> Result<(), CaseError> {
        for outcome in outcomes {
            let types: Vec<&str> = outcome.artifact_types.iter().map(|t| t.as_str()).collect();
            tracing::info!(
                file = outcome.file.0,
                path = %outcome.path.display(),
                artifacts = ?types,
                "evidence recorded"
            );
        }
        case.record_evidence(outcomes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArtifactType, FileId};
    use std::path::PathBuf;

    #[test]
    fn ledger_appends_to_case() {
        let mut case = CaseContext::new("/cases/a");
        let outcomes = vec![
            EvidenceOutcome {
                file: FileId(1),
                path: PathBuf::from("/e/SYSTEM.json"),
                artifact_types: vec![ArtifactType::System],
            },
            EvidenceOutcome {
                file: FileId(3),
                path: PathBuf::from("/e/SOFTWARE.json"),
                artifact_types: vec![ArtifactType::Software],
            },
        ];

        EvidenceLedger
            .write_evidence_record(&mut case, &outcomes)
            .expect("record");

        let files: Vec<FileId> = case.evidence().iter().map(|r| r.file).collect();
        assert_eq!(files, vec![FileId(1), FileId(3)]);
    }

    #[test]
    fn null_progress_accepts_anything() {
        let mut sink = NullProgress;
        sink.notify("Starting Processing");
        sink.notify("");
    }
}
