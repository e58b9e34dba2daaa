//! End-to-end analysis of one project snapshot:
//! normalize, resolve filters and build links, aggregate, derive insights.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tcov_error::{Result, TcovError};
use tcov_types::{Corpus, LinkSet, RawSnapshot, Warning};
use tracing::info;

use crate::config::EngineConfig;
use crate::context::RunContext;
use crate::coverage::{CoverageReport, aggregate};
use crate::insights::{Insights, build_insights};
use crate::links::build_links;
use crate::normalize::normalize_snapshot;

/// Bump when the report layout changes incompatibly.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Everything a renderer or exporter needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub generated_unix_ms: u128,
    pub project: String,
    /// SHA-256 of the JSON encoding of the input snapshot.
    pub snapshot_fingerprint: String,
    pub coverage: CoverageReport,
    pub insights: Insights,
    pub diagnostics: Vec<Warning>,
}

impl AnalysisReport {
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Report plus the intermediate values the store persists.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub corpus: Corpus,
    pub links: LinkSet,
    pub report: AnalysisReport,
}

/// Decode a snapshot from JSON text.
pub fn snapshot_from_json(text: &str) -> Result<RawSnapshot> {
    serde_json::from_str(text).map_err(|error| TcovError::snapshot(error.to_string()))
}

/// Read and decode a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<RawSnapshot> {
    let text = std::fs::read_to_string(path)?;
    snapshot_from_json(&text)
}

pub fn snapshot_fingerprint(snapshot: &RawSnapshot) -> Result<String> {
    let bytes = serde_json::to_vec(snapshot).map_err(|error| TcovError::ReportEncode {
        detail: error.to_string(),
    })?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0F)]));
    }
    out
}

fn unix_time_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}

/// Run every stage over one snapshot.
///
/// Only configuration errors abort; entity problems end up in
/// `report.diagnostics`.
pub fn run(snapshot: &RawSnapshot, config: &EngineConfig) -> Result<AnalysisRun> {
    config.validate()?;
    let mut ctx = RunContext::new();

    let corpus = normalize_snapshot(snapshot, config.project_root.as_deref(), &mut ctx);
    info!(
        project = %snapshot.project,
        cases = corpus.cases.len(),
        suites = corpus.suites.len(),
        "corpus normalized"
    );

    let links = build_links(&corpus.cases, &corpus.suites, &mut ctx);
    info!(
        links = links.links.len(),
        fanout = links.fanout.len(),
        "links built"
    );

    let coverage = aggregate(&corpus.cases, &corpus.suites, &links, config.module_depth)?;
    let insights = build_insights(&corpus.cases, &corpus.suites, &links, &coverage, config);
    info!(
        covered = coverage.totals.covered_cases,
        total = coverage.totals.total_cases,
        coverage_pct = coverage.totals.coverage_pct,
        total_executions = coverage.totals.total_executions,
        warnings = ctx.warnings().len(),
        "coverage aggregated"
    );

    let report = AnalysisReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_unix_ms: unix_time_ms(),
        project: snapshot.project.clone(),
        snapshot_fingerprint: snapshot_fingerprint(snapshot)?,
        coverage,
        insights,
        diagnostics: ctx.into_warnings(),
    };
    Ok(AnalysisRun {
        corpus,
        links,
        report,
    })
}

/// Run every stage and keep only the report.
pub fn analyze(snapshot: &RawSnapshot, config: &EngineConfig) -> Result<AnalysisReport> {
    run(snapshot, config).map(|outcome| outcome.report)
}

/// Render diagnostics as deterministic single-line entries.
pub fn render_diagnostics(report: &AnalysisReport) -> Vec<String> {
    report
        .diagnostics
        .iter()
        .map(ToString::to_string)
        .collect()
}
