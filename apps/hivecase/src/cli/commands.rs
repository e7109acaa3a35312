//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use hivecase_core::{
    CaseBuilder, CaseContext, CaseError, ConsistencyReport, EvidenceLedger, ExportAcquirer,
    InitMode, RelationalStore, RunReport, RunRequest, TracingProgress, read_snapshot,
    verify_case,
};
use serde_json::json;
use std::path::{Path, PathBuf};

// =============================================================================
// PATH HANDLING
// =============================================================================

/// Resolve evidence paths to absolute form.
///
/// Evidence identity within a case is its path, so `./SYSTEM.json` and
/// `/cases/evidence/SYSTEM.json` must compare equal across runs. Paths that
/// cannot be resolved are kept as given; the acquirer will skip them.
pub fn normalize_evidence(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| path.canonicalize().unwrap_or_else(|_| path.clone()))
        .collect()
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// NEW / ADD COMMANDS
// =============================================================================

/// Create a case in `case_dir` from `evidence`.
pub fn cmd_new(
    case_dir: &Path,
    config: &AppConfig,
    json_mode: bool,
    evidence: &[PathBuf],
) -> Result<(), CaseError> {
    let report = build(case_dir, InitMode::Fresh, config, evidence)?;
    print_report(&report, json_mode);
    Ok(())
}

/// Extend the case in `case_dir` with `evidence`.
pub fn cmd_add(
    case_dir: &Path,
    config: &AppConfig,
    json_mode: bool,
    evidence: &[PathBuf],
) -> Result<(), CaseError> {
    let report = build(case_dir, InitMode::Resume, config, evidence)?;
    print_report(&report, json_mode);
    Ok(())
}

/// Run one full processing pass.
pub fn build(
    case_dir: &Path,
    mode: InitMode,
    config: &AppConfig,
    evidence: &[PathBuf],
) -> Result<RunReport, CaseError> {
    tracing::info!(
        case = %case_dir.display(),
        evidence = evidence.len(),
        mode = ?mode,
        "processing run"
    );

    let request = RunRequest {
        case_directory: case_dir.to_path_buf(),
        mode,
        evidence: normalize_evidence(evidence),
    };
    let mut progress = TracingProgress;
    let mut acquirer = ExportAcquirer::new(config.acquire.max_export_bytes);
    let mut builder = CaseBuilder::new(&mut progress);
    builder.run(&request, &mut acquirer, &mut EvidenceLedger)
}

fn print_report(report: &RunReport, json_mode: bool) {
    if json_mode {
        print_json(&serde_json::to_value(report).unwrap_or_default());
        return;
    }

    println!("hivecase Run Report");
    println!("===================");
    println!("Mode:       {:?}", report.mode);
    println!("Accepted:   {}", report.accepted.len());
    for outcome in &report.accepted {
        let types: Vec<&str> = outcome.artifact_types.iter().map(|t| t.as_str()).collect();
        println!(
            "  [{}] {} ({})",
            outcome.file.0,
            outcome.path.display(),
            types.join(", ")
        );
    }
    println!("Skipped:    {}", report.skipped.len());
    for path in &report.skipped {
        println!("  {}", path.display());
    }
    println!();
    println!("Nodes existing:   {}", report.existing_nodes);
    println!("Nodes added:      {}", report.nodes_added);
    println!("Values added:     {}", report.attributes_added);
    let repeated = report.duplicate_edges + report.duplicate_attributes;
    if repeated > 0 {
        println!("Rows already stored: {}", repeated);
    }
    if report.adopted_nodes > 0 {
        println!("Nodes recovered:  {}", report.adopted_nodes);
    }
    if let Some(snapshot) = &report.snapshot {
        println!("Snapshot:         {}", snapshot.display());
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show case status.
pub fn cmd_status(case_dir: &Path, json_mode: bool) -> Result<(), CaseError> {
    let case = read_snapshot(case_dir)?;
    let store = RelationalStore::open_read_only(case_dir)?;
    let edges = store.edge_count()?;
    let attributes = store.attribute_count()?;

    if json_mode {
        print_json(&status_json(&case, edges, attributes));
        return Ok(());
    }

    println!("hivecase Case Status");
    println!("====================");
    println!("Case:       {}", case_dir.display());
    println!("Runs:       {}", case.runs());
    println!();
    println!("Nodes:      {}", case.tree().node_count());
    println!("Edges:      {}", edges);
    println!("Values:     {}", attributes);
    println!("Strings:    {}", case.strings().len());
    println!();
    println!("Evidence:   {}", case.evidence().len());
    for record in case.evidence() {
        let types: Vec<&str> = record.artifact_types.iter().map(|t| t.as_str()).collect();
        println!(
            "  [{}] run {} {} ({})",
            record.file.0,
            record.run,
            record.path.display(),
            types.join(", ")
        );
    }

    Ok(())
}

/// JSON body of `status --json-mode`.
pub fn status_json(case: &CaseContext, edges: usize, attributes: usize) -> serde_json::Value {
    let evidence: Vec<serde_json::Value> = case
        .evidence()
        .iter()
        .map(|record| {
            json!({
                "file": record.file.0,
                "path": record.path.to_string_lossy(),
                "run": record.run,
                "artifact_types": record
                    .artifact_types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "case": case.directory().to_string_lossy(),
        "runs": case.runs(),
        "node_count": case.tree().node_count(),
        "edge_count": edges,
        "value_count": attributes,
        "string_count": case.strings().len(),
        "evidence": evidence
    })
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Verify that snapshot and store agree. Inconsistency is an error.
pub fn cmd_verify(case_dir: &Path, json_mode: bool) -> Result<(), CaseError> {
    let case = read_snapshot(case_dir)?;
    let store = RelationalStore::open_read_only(case_dir)?;
    let report = verify_case(&case, &store)?;

    if json_mode {
        let mut value = serde_json::to_value(&report).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("consistent".to_string(), json!(report.is_consistent()));
        }
        print_json(&value);
    } else {
        print_consistency(case_dir, &report);
    }

    if report.is_consistent() {
        Ok(())
    } else {
        Err(CaseError::Store(format!(
            "case {} failed verification",
            case_dir.display()
        )))
    }
}

fn print_consistency(case_dir: &Path, report: &ConsistencyReport) {
    println!("hivecase Case Verification");
    println!("==========================");
    println!("Case:              {}", case_dir.display());
    println!("Snapshot nodes:    {}", report.snapshot_nodes);
    println!("Stored edges:      {}", report.stored_edges);
    println!("Stored values:     {}", report.stored_attributes);
    println!();
    println!("Missing from store:   {}", report.missing_from_store.len());
    println!("Not checkpointed:     {}", report.uncheckpointed.len());
    println!("Conflicting nodes:    {}", report.conflicting.len());
    println!("Dangling parents:     {}", report.dangling_parents.len());
    println!("Orphan values:        {}", report.orphan_attributes.len());
    println!(
        "Child index:          {}",
        if report.child_index_matches {
            "ok"
        } else {
            "MISMATCH"
        }
    );
    println!();
    if report.is_consistent() {
        println!("Result: CONSISTENT");
    } else {
        println!("Result: INCONSISTENT");
    }
}
