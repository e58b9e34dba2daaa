//! Suite resolution and coverage engine.
//!
//! Stages run leaf to root over one project snapshot, each a pure function of
//! the previous stage's output plus an explicit [`RunContext`] for warnings:
//!
//! 1. [`normalize`]: raw records to [`tcov_types::Corpus`].
//! 2. [`filter`]: dynamic suite predicates to matching case sets.
//! 3. [`links`]: case-suite links and collection fan-out.
//! 4. [`coverage`]: totals, module buckets, reuse, execution counts.
//!
//! [`insights`] adds report sections derived from the same inputs and
//! [`pipeline`] wires everything together behind [`run`] and [`analyze`].

pub mod config;
pub mod context;
pub mod coverage;
pub mod filter;
pub mod insights;
pub mod links;
pub mod normalize;
pub mod pipeline;

pub use config::{EngineConfig, TagLabel};
pub use context::RunContext;
pub use coverage::{CoverageReport, CoverageTotals, aggregate, percentage};
pub use filter::{FilterSyntaxError, ParsedFilter, parse_filter, parse_filter_text, resolve};
pub use insights::{Insights, build_insights};
pub use links::build_links;
pub use normalize::normalize_snapshot;
pub use pipeline::{
    AnalysisReport, AnalysisRun, REPORT_SCHEMA_VERSION, analyze, load_snapshot,
    render_diagnostics, run, snapshot_from_json,
};
