//! Canonical per-run model.
//!
//! All values are owned by a single analysis run over one project snapshot;
//! nothing here is shared or mutated across runs.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable test case identifier: the source GUID, or the normalized path when
/// the GUID is absent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable suite identifier, same addressing scheme as [`CaseId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(String);

impl SuiteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: CaseId,
    pub name: String,
    /// Slash-delimited, project-relative, extension stripped. Never empty.
    pub folder_path: String,
    /// Case-sensitive tag names.
    pub tags: BTreeSet<String>,
    /// Bound to at least one test-data link.
    pub parameterized: bool,
    pub has_variables: bool,
    pub updated_at: Option<String>,
}

/// Tag with its usage count derived from the current corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub usage_count: usize,
}

/// Tag-set criterion of a filter predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCriterion {
    pub tags: BTreeSet<String>,
    /// When set, a case matches only if it carries none of `tags`.
    pub negated: bool,
}

/// Conjunction of at most one tag criterion and at most one name substring.
/// The empty predicate matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub tags: Option<TagCriterion>,
    pub name: Option<String>,
}

impl FilterPredicate {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.name.is_none()
    }
}

/// Plain discriminator of the three suite kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteKind {
    Static,
    Dynamic,
    Collection,
}

impl SuiteKind {
    /// Name the source tool shows for this kind.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Static => "Test Suite",
            Self::Dynamic => "Dynamic Test Suite",
            Self::Collection => "Test Suite Collection",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Collection => "collection",
        }
    }
}

/// Orchestration settings of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Upper-cased mode as authored, e.g. `SEQUENTIAL` or `PARALLEL`.
    pub execution_mode: String,
    pub max_concurrent: u32,
    pub delay_seconds: u32,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            execution_mode: "SEQUENTIAL".to_owned(),
            max_concurrent: 1,
            delay_seconds: 0,
        }
    }
}

/// One run configuration inside a collection. The same suite may appear in
/// several entries of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub collection_id: SuiteId,
    pub suite_path: String,
    pub enabled: bool,
    pub group: String,
    pub profile: String,
    pub browser: String,
}

/// Kind-specific payload; each variant carries only what its kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuiteBody {
    Static {
        /// Authored references in order, unresolved.
        case_refs: Vec<String>,
    },
    Dynamic {
        filter_text: String,
        predicate: FilterPredicate,
    },
    Collection {
        entries: Vec<CollectionEntry>,
        settings: CollectionSettings,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub id: SuiteId,
    pub name: String,
    /// Project-relative path, extension stripped.
    pub path: String,
    pub body: SuiteBody,
}

impl Suite {
    pub const fn kind(&self) -> SuiteKind {
        match self.body {
            SuiteBody::Static { .. } => SuiteKind::Static,
            SuiteBody::Dynamic { .. } => SuiteKind::Dynamic,
            SuiteBody::Collection { .. } => SuiteKind::Collection,
        }
    }
}

/// Normalized test cases and suites of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub cases: Vec<TestCase>,
    pub suites: Vec<Suite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    Explicit,
    Filter,
}

impl LinkOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Filter => "filter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseSuiteLink {
    pub case_id: CaseId,
    pub suite_id: SuiteId,
    pub origin: LinkOrigin,
}

/// A collection entry with its referenced suite resolved to a case count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FanoutEntry {
    pub collection_id: SuiteId,
    pub suite_path: String,
    /// `None` when the referenced suite could not be resolved.
    pub suite_id: Option<SuiteId>,
    pub group: String,
    pub profile: String,
    pub browser: String,
    pub enabled: bool,
    /// Cases of the referenced suite at resolution time.
    pub case_count: usize,
}

impl FanoutEntry {
    /// Execution instances this entry contributes.
    pub const fn executions(&self) -> usize {
        if self.enabled && self.suite_id.is_some() {
            self.case_count
        } else {
            0
        }
    }
}

/// Output of the link builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet {
    pub links: Vec<CaseSuiteLink>,
    pub fanout: Vec<FanoutEntry>,
}
