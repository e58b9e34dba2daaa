//! Per-run state threaded explicitly through every stage.

use tcov_types::{Warning, WarningKind};
use tracing::debug;

/// Warnings collected during one analysis run.
///
/// Each stage takes `&mut RunContext`; there is no process-wide state, so
/// concurrent runs over different snapshots cannot interfere.
#[derive(Debug, Default)]
pub struct RunContext {
    warnings: Vec<Warning>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-fatal problem.
    ///
    /// Callers report the collected list to the user; the log only carries a
    /// `debug!` trace of it.
    pub fn warn(&mut self, kind: WarningKind, entity: impl Into<String>, detail: impl Into<String>) {
        let warning = Warning {
            kind,
            entity: entity.into(),
            detail: detail.into(),
        };
        debug!(
            kind = %warning.kind,
            entity = %warning.entity,
            detail = %warning.detail,
            "analysis warning recorded"
        );
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.kind == kind)
            .count()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
