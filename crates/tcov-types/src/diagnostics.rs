use std::fmt;

use serde::{Deserialize, Serialize};

/// Warning class emitted while normalizing, resolving or linking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingIdentifier,
    DuplicateIdentifier,
    DanglingReference,
    MalformedFilter,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::MissingIdentifier => "missing_identifier",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::DanglingReference => "dangling_reference",
            Self::MalformedFilter => "malformed_filter",
        };
        f.write_str(value)
    }
}

/// One non-fatal problem with entity-scoped detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// Name or identifier of the entity the warning is about.
    pub entity: String,
    pub detail: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kind={} entity={} detail={}",
            self.kind, self.entity, self.detail
        )
    }
}
