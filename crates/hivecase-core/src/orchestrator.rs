//! # Case Construction Orchestrator
//!
//! Drives one processing run over a case directory:
//!
//! ```text
//! Idle -> Initializing(Fresh | Resume) -> Acquiring -> Committing -> Checkpointing -> Done
//!                  \                          \            \               \
//!                   +--------------------------+------------+---------------+--> Failed
//! ```
//!
//! - `initialize` builds an empty case or loads the snapshot and rehydrates
//!   the session caches from the relational store.
//! - `process_evidence` hands each evidence path to the acquirer, in order.
//!   Skipped sources drop out of the run; a rejected source aborts it before
//!   anything is committed.
//! - `commit` records the surviving evidence, writes new strings, tree
//!   edges and attribute rows, and rebuilds the child index from the stored
//!   edges.
//! - `checkpoint` drops the working caches and writes the snapshot.
//!
//! Calling an operation out of order returns `CaseError::InvalidState` and
//! leaves the phase untouched. Any other error moves the run to `Failed`.

use crate::acquire::Acquirer;
use crate::case::CaseContext;
use crate::formats::{read_snapshot, snapshot_path, write_snapshot};
use crate::sink::{EvidenceSink, ProgressSink};
use crate::storage::RelationalStore;
use crate::{CaseError, Classification, EvidenceOutcome, EvidenceSource, TreeNode};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// PHASES
// =============================================================================

/// How a case directory is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitMode {
    /// Start a new case in an empty directory.
    Fresh,
    /// Extend the case checkpointed in the directory.
    Resume,
}

/// Position of a `CaseBuilder` in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing(InitMode),
    Acquiring,
    Committing,
    Checkpointing,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Initializing(InitMode::Fresh) => f.write_str("initializing (fresh)"),
            Phase::Initializing(InitMode::Resume) => f.write_str("initializing (resume)"),
            Phase::Acquiring => f.write_str("acquiring"),
            Phase::Committing => f.write_str("committing"),
            Phase::Checkpointing => f.write_str("checkpointing"),
            Phase::Done => f.write_str("done"),
            Phase::Failed => f.write_str("failed"),
        }
    }
}

// =============================================================================
// REQUEST / REPORT
// =============================================================================

/// Input of `CaseBuilder::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub case_directory: PathBuf,
    pub mode: InitMode,
    pub evidence: Vec<PathBuf>,
}

/// What a run did to the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: InitMode,
    /// Evidence kept by the run, in processing order.
    pub accepted: Vec<EvidenceOutcome>,
    /// Evidence dropped by the acquirer.
    pub skipped: Vec<PathBuf>,
    /// Nodes adopted from the store during rehydration.
    pub adopted_nodes: usize,
    /// Nodes already stored when the run began.
    pub existing_nodes: usize,
    pub nodes_added: usize,
    pub duplicate_edges: usize,
    pub attributes_added: usize,
    pub duplicate_attributes: usize,
    /// Snapshot written by the checkpoint.
    pub snapshot: Option<PathBuf>,
}

impl RunReport {
    fn new(mode: InitMode) -> Self {
        Self {
            mode,
            accepted: Vec::new(),
            skipped: Vec::new(),
            adopted_nodes: 0,
            existing_nodes: 0,
            nodes_added: 0,
            duplicate_edges: 0,
            attributes_added: 0,
            duplicate_attributes: 0,
            snapshot: None,
        }
    }
}

// =============================================================================
// CASE BUILDER
// =============================================================================

/// Single-use orchestrator for one run over one case directory.
///
/// The builder exclusively owns the relational store handles for the
/// duration of the run; drop it before opening the same case again.
pub struct CaseBuilder<'a> {
    progress: &'a mut dyn ProgressSink,
    phase: Phase,
    case: Option<CaseContext>,
    store: Option<RelationalStore>,
    report: RunReport,
}

impl fmt::Debug for CaseBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseBuilder")
            .field("phase", &self.phase)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<'a> CaseBuilder<'a> {
    #[must_use]
    pub fn new(progress: &'a mut dyn ProgressSink) -> Self {
        Self {
            progress,
            phase: Phase::Idle,
            case: None,
            store: None,
            report: RunReport::new(InitMode::Fresh),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The case under construction, once initialized.
    #[must_use]
    pub fn case(&self) -> Option<&CaseContext> {
        self.case.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> Option<&RelationalStore> {
        self.store.as_ref()
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Release the case and store handles.
    pub fn into_parts(self) -> (Option<CaseContext>, Option<RelationalStore>) {
        (self.case, self.store)
    }

    // =========================================================================
    // STATE HELPERS
    // =========================================================================

    fn expect_phase(&self, ok: bool, expected: &'static str) -> Result<(), CaseError> {
        if ok {
            Ok(())
        } else {
            Err(CaseError::InvalidState {
                expected,
                actual: self.phase.to_string(),
            })
        }
    }

    fn enter(&mut self, phase: Phase, stage: &str) {
        tracing::debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.progress.notify(stage);
    }

    fn settle<T>(&mut self, result: Result<T, CaseError>) -> Result<T, CaseError> {
        if let Err(e) = &result {
            tracing::error!(phase = %self.phase, error = %e, "case construction failed");
            self.phase = Phase::Failed;
        }
        result
    }

    fn parts(&mut self) -> Result<(&mut CaseContext, &RelationalStore), CaseError> {
        match (self.case.as_mut(), self.store.as_ref()) {
            (Some(case), Some(store)) => Ok((case, store)),
            _ => Err(CaseError::InvalidState {
                expected: "initialized case",
                actual: self.phase.to_string(),
            }),
        }
    }

    // =========================================================================
    // INITIALIZE
    // =========================================================================

    /// Open `case_directory` for this run.
    ///
    /// - `Fresh` refuses a directory that already holds a snapshot
    ///   (`CaseError::CaseExists`). Rows committed by an earlier fresh run
    ///   that never wrote its snapshot are discarded.
    /// - `Resume` requires a snapshot (`CaseError::CaseNotFound`) and
    ///   rehydrates the session caches from the store.
    pub fn initialize(&mut self, case_directory: &Path, mode: InitMode) -> Result<(), CaseError> {
        self.expect_phase(self.phase == Phase::Idle, "idle")?;
        self.report = RunReport::new(mode);
        self.enter(Phase::Initializing(mode), "Initializing case");
        let result = self.open(case_directory, mode);
        self.settle(result)
    }

    fn open(&mut self, case_directory: &Path, mode: InitMode) -> Result<(), CaseError> {
        match mode {
            InitMode::Fresh => {
                if snapshot_path(case_directory).exists() {
                    return Err(CaseError::CaseExists(case_directory.to_path_buf()));
                }
                let store = RelationalStore::create_schema(case_directory)?;
                let edges = store.edge_count()?;
                let attributes = store.attribute_count()?;
                if edges > 0 || attributes > 0 || store.string_count()? > 0 {
                    tracing::warn!(
                        case = %case_directory.display(),
                        edges,
                        attributes,
                        "discarding rows of a run that was never checkpointed"
                    );
                    store.clear()?;
                }
                tracing::info!(case = %case_directory.display(), "new case");
                self.case = Some(CaseContext::new(case_directory));
                self.store = Some(store);
            }
            InitMode::Resume => {
                let mut case = read_snapshot(case_directory)?;
                case.relocate(case_directory);
                let store = RelationalStore::create_schema(case_directory)?;
                let stats = case.rehydrate(&store)?;
                tracing::info!(
                    case = %case_directory.display(),
                    runs = case.runs(),
                    edges = stats.edges,
                    attributes = stats.attributes,
                    adopted = stats.adopted,
                    adopted_strings = stats.adopted_strings,
                    "case resumed"
                );
                self.report.adopted_nodes = stats.adopted;
                self.report.existing_nodes = stats.edges;
                self.case = Some(case);
                self.store = Some(store);
            }
        }
        Ok(())
    }

    // =========================================================================
    // ACQUIRE
    // =========================================================================

    /// Acquire each evidence path in order.
    ///
    /// Returns the accepted outcomes. Fails with `BadEvidence` on the first
    /// rejected source and with `NoValidEvidence` when nothing is accepted.
    pub fn process_evidence(
        &mut self,
        evidence: &[PathBuf],
        acquirer: &mut dyn Acquirer,
    ) -> Result<&[EvidenceOutcome], CaseError> {
        self.expect_phase(
            matches!(self.phase, Phase::Initializing(_)),
            "initializing",
        )?;
        self.enter(Phase::Acquiring, "Acquiring evidence");
        let result = self.acquire_all(evidence, acquirer);
        self.settle(result)?;
        Ok(&self.report.accepted)
    }

    fn acquire_all(
        &mut self,
        evidence: &[PathBuf],
        acquirer: &mut dyn Acquirer,
    ) -> Result<(), CaseError> {
        let total = evidence.len();
        let case = self.case.as_mut().ok_or_else(|| CaseError::InvalidState {
            expected: "initialized case",
            actual: Phase::Acquiring.to_string(),
        })?;

        for (index, path) in evidence.iter().enumerate() {
            self.progress.notify(&format!(
                "Processing evidence {} of {}: {}",
                index + 1,
                total,
                path.display()
            ));
            let source = EvidenceSource {
                path: path.clone(),
                file: case.allocate_file(),
            };

            match acquirer.acquire(&source, case)? {
                Classification::Accepted(artifact_types) => {
                    tracing::debug!(path = %path.display(), file = source.file.0, "evidence accepted");
                    self.report.accepted.push(EvidenceOutcome {
                        file: source.file,
                        path: source.path,
                        artifact_types,
                    });
                }
                Classification::Skipped => {
                    tracing::warn!(path = %path.display(), "evidence skipped");
                    self.report.skipped.push(source.path);
                }
                Classification::Rejected => {
                    return Err(CaseError::BadEvidence {
                        evidence: source.path,
                        reason: "inconsistent with the existing case".to_string(),
                    });
                }
            }
        }

        if self.report.accepted.is_empty() {
            return Err(CaseError::NoValidEvidence);
        }
        Ok(())
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    /// Persist evidence metadata, tree edges and attribute rows.
    pub fn commit(&mut self, evidence_sink: &mut dyn EvidenceSink) -> Result<(), CaseError> {
        self.expect_phase(self.phase == Phase::Acquiring, "acquiring")?;
        self.enter(Phase::Committing, "Committing");
        let result = self.commit_all(evidence_sink);
        self.settle(result)
    }

    fn commit_all(&mut self, evidence_sink: &mut dyn EvidenceSink) -> Result<(), CaseError> {
        let outcomes = self.report.accepted.clone();
        let (case, store) = self.parts()?;

        evidence_sink.write_evidence_record(case, &outcomes)?;

        let stored_strings = store.string_count()?;
        store.commit_strings(case.strings().entries_from(stored_strings))?;

        let edges: Vec<TreeNode> = case.tree().pending_edges().collect();
        let edge_stats = store.commit_tree_edges(&edges)?;

        let rows = case.values_mut().take_pending();
        let row_stats = store.commit_attributes(&rows)?;

        let stored = store.load_all_edges()?;
        case.tree_mut().rebuild_child_index(stored);
        case.tree_mut().mark_stored();

        tracing::info!(
            nodes = edge_stats.inserted,
            duplicate_edges = edge_stats.duplicates,
            attributes = row_stats.inserted,
            duplicate_attributes = row_stats.duplicates,
            "commit complete"
        );
        self.report.nodes_added = edge_stats.inserted;
        self.report.duplicate_edges = edge_stats.duplicates;
        self.report.attributes_added = row_stats.inserted;
        self.report.duplicate_attributes = row_stats.duplicates;
        Ok(())
    }

    // =========================================================================
    // CHECKPOINT
    // =========================================================================

    /// Write the case snapshot and finish the run.
    pub fn checkpoint(&mut self) -> Result<PathBuf, CaseError> {
        self.expect_phase(self.phase == Phase::Committing, "committing")?;
        self.enter(Phase::Checkpointing, "Checkpointing");
        let result = match self.case.as_mut() {
            Some(case) => {
                case.prepare_checkpoint();
                write_snapshot(case)
            }
            None => Err(CaseError::InvalidState {
                expected: "initialized case",
                actual: Phase::Checkpointing.to_string(),
            }),
        };
        let path = self.settle(result)?;
        self.report.snapshot = Some(path.clone());
        self.enter(Phase::Done, "Done");
        Ok(path)
    }

    // =========================================================================
    // FULL RUN
    // =========================================================================

    /// Initialize, acquire, commit and checkpoint in one call.
    pub fn run(
        &mut self,
        request: &RunRequest,
        acquirer: &mut dyn Acquirer,
        evidence_sink: &mut dyn EvidenceSink,
    ) -> Result<RunReport, CaseError> {
        self.progress.notify("Starting Processing");
        self.initialize(&request.case_directory, request.mode)?;
        self.process_evidence(&request.evidence, acquirer)?;
        self.commit(evidence_sink)?;
        self.checkpoint()?;
        Ok(self.report.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::acquire::ExportAcquirer;
    use crate::sink::{EvidenceLedger, NullProgress};
    use crate::{ArtifactType, FileId, NamespaceStore};
    use tempfile::tempdir;

    /// Collects stage labels.
    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ProgressSink for Recorder {
        fn notify(&mut self, stage: &str) {
            self.0.push(stage.to_string());
        }
    }

    fn write_export(dir: &Path, name: &str, artifact: &str, keys: &[&[&str]]) -> PathBuf {
        let keys: Vec<serde_json::Value> = keys
            .iter()
            .map(|path| {
                serde_json::json!({
                    "path": path,
                    "values": [{ "name": "Start", "type": "REG_DWORD", "raw": [2, 0, 0, 0], "text": "2" }]
                })
            })
            .collect();
        let doc = serde_json::json!({ "artifact_type": artifact, "keys": keys });
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn fresh_run_reaches_done() {
        let evidence_dir = tempdir().unwrap();
        let case_dir = tempdir().unwrap();
        let export = write_export(
            evidence_dir.path(),
            "SYSTEM.json",
            "SYSTEM",
            &[&["ControlSet001", "Services", "Tcpip"]],
        );

        let mut progress = Recorder::default();
        let mut builder = CaseBuilder::new(&mut progress);
        let report = builder
            .run(
                &RunRequest {
                    case_directory: case_dir.path().to_path_buf(),
                    mode: InitMode::Fresh,
                    evidence: vec![export],
                },
                &mut ExportAcquirer::default(),
                &mut EvidenceLedger,
            )
            .unwrap();

        assert_eq!(builder.phase(), Phase::Done);
        // three key nodes and one value-name node
        assert_eq!(report.nodes_added, 4);
        assert_eq!(report.attributes_added, 1);
        assert_eq!(report.accepted[0].artifact_types, vec![ArtifactType::System]);
        assert!(report.snapshot.as_deref().is_some_and(Path::is_file));

        let case = builder.case().unwrap();
        assert_eq!(case.runs(), 1);
        assert_eq!(case.evidence()[0].file, FileId(1));
        drop(builder);

        assert_eq!(progress.0.first().map(String::as_str), Some("Starting Processing"));
        assert!(progress.0.iter().any(|s| s == "Committing"));
        assert_eq!(progress.0.last().map(String::as_str), Some("Done"));
    }

    #[test]
    fn out_of_order_call_is_invalid_state() {
        let mut progress = NullProgress;
        let mut builder = CaseBuilder::new(&mut progress);

        let result = builder.commit(&mut EvidenceLedger);
        assert!(matches!(
            result,
            Err(CaseError::InvalidState { expected: "acquiring", .. })
        ));
        assert_eq!(builder.phase(), Phase::Idle);
    }

    #[test]
    fn resume_without_snapshot_fails() {
        let case_dir = tempdir().unwrap();
        let mut progress = NullProgress;
        let mut builder = CaseBuilder::new(&mut progress);

        let result = builder.initialize(case_dir.path(), InitMode::Resume);
        assert!(matches!(result, Err(CaseError::CaseNotFound(_))));
        assert_eq!(builder.phase(), Phase::Failed);
    }

    #[test]
    fn fresh_over_existing_case_fails() {
        let evidence_dir = tempdir().unwrap();
        let case_dir = tempdir().unwrap();
        let export = write_export(evidence_dir.path(), "SAM.json", "SAM", &[&["SAM", "Domains"]]);

        let mut progress = NullProgress;
        let request = RunRequest {
            case_directory: case_dir.path().to_path_buf(),
            mode: InitMode::Fresh,
            evidence: vec![export],
        };
        {
            let mut builder = CaseBuilder::new(&mut progress);
            builder
                .run(&request, &mut ExportAcquirer::default(), &mut EvidenceLedger)
                .unwrap();
        }

        let mut builder = CaseBuilder::new(&mut progress);
        let result = builder.initialize(case_dir.path(), InitMode::Fresh);
        assert!(matches!(result, Err(CaseError::CaseExists(_))));
    }

    #[test]
    fn all_skipped_is_no_valid_evidence() {
        let evidence_dir = tempdir().unwrap();
        let case_dir = tempdir().unwrap();
        let bogus = evidence_dir.path().join("bogus.json");
        std::fs::write(&bogus, "not json").unwrap();

        let mut progress = NullProgress;
        let mut builder = CaseBuilder::new(&mut progress);
        builder.initialize(case_dir.path(), InitMode::Fresh).unwrap();
        let result = builder.process_evidence(&[bogus.clone()], &mut ExportAcquirer::default());

        assert!(matches!(result, Err(CaseError::NoValidEvidence)));
        assert_eq!(builder.phase(), Phase::Failed);
        assert_eq!(builder.report().skipped, vec![bogus]);
        assert!(!snapshot_path(case_dir.path()).exists());
    }

    #[test]
    fn resume_commits_only_new_edges() {
        let evidence_dir = tempdir().unwrap();
        let case_dir = tempdir().unwrap();
        let first = write_export(evidence_dir.path(), "SYSTEM.json", "SYSTEM", &[&["Select"]]);
        let second = write_export(
            evidence_dir.path(),
            "SYSTEM2.json",
            "SYSTEM",
            &[&["Select"], &["Setup"]],
        );

        let mut progress = NullProgress;
        let mut request = RunRequest {
            case_directory: case_dir.path().to_path_buf(),
            mode: InitMode::Fresh,
            evidence: vec![first],
        };
        CaseBuilder::new(&mut progress)
            .run(&request, &mut ExportAcquirer::default(), &mut EvidenceLedger)
            .unwrap();

        request.mode = InitMode::Resume;
        request.evidence = vec![second];
        let report = CaseBuilder::new(&mut progress)
            .run(&request, &mut ExportAcquirer::default(), &mut EvidenceLedger)
            .unwrap();

        // Select and Select\Start were stored by the first run
        assert_eq!(report.existing_nodes, 2);
        assert_eq!(report.nodes_added, 2);
        assert_eq!(report.duplicate_edges, 0);
        // Select\Start is shared; only Setup\Start is a new row
        assert_eq!(report.attributes_added, 1);
    }

    #[test]
    fn commit_rebuilds_child_index() {
        let evidence_dir = tempdir().unwrap();
        let case_dir = tempdir().unwrap();
        let export = write_export(
            evidence_dir.path(),
            "SOFTWARE.json",
            "SOFTWARE",
            &[&["Microsoft", "Windows"], &["Microsoft", "Office"]],
        );

        let mut progress = NullProgress;
        let mut builder = CaseBuilder::new(&mut progress);
        builder.initialize(case_dir.path(), InitMode::Fresh).unwrap();
        builder
            .process_evidence(&[export], &mut ExportAcquirer::default())
            .unwrap();
        builder.commit(&mut EvidenceLedger).unwrap();

        let case = builder.case().unwrap();
        let microsoft = case
            .strings()
            .find(b"Microsoft")
            .and_then(|label| case.tree().find(crate::primitives::ROOT_PARENT, label))
            .unwrap();
        assert_eq!(case.tree().children(microsoft.id).len(), 2);
        assert_eq!(builder.phase(), Phase::Committing);
    }
}
