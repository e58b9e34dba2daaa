//! Upstream input contract: one project snapshot as produced by the file-format
//! reader. Nothing here is validated; the engine's normalizer owns that.

use serde::{Deserialize, Serialize};

/// Everything the reader extracted from one project at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    /// Human-readable project name, echoed into the report.
    pub project: String,
    /// Absolute or reader-specific prefix to strip from every entity path.
    pub project_root: Option<String>,
    pub test_cases: Vec<RawTestCase>,
    pub suites: Vec<RawSuite>,
}

/// One test case record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTestCase {
    #[serde(default)]
    pub identifier: Option<String>,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub tags: Option<RawTags>,
    #[serde(default)]
    pub has_test_data_links: bool,
    #[serde(default)]
    pub has_variables: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Tags as the reader saw them: either the source's comma-delimited string or
/// an already-split list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    Delimited(String),
    List(Vec<String>),
}

/// One suite-like record. The three source entity types share the header
/// fields and differ only in `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSuite {
    #[serde(default)]
    pub identifier: Option<String>,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(flatten)]
    pub body: RawSuiteBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSuiteBody {
    /// Explicitly authored case list (identifiers or case paths).
    Static {
        #[serde(default)]
        case_refs: Vec<String>,
    },
    /// Filter-based membership, e.g. `name=(Login) tag=(smoke,)`.
    Dynamic {
        #[serde(default)]
        filter_text: Option<String>,
    },
    /// Orchestration of other suites under run configurations.
    Collection {
        #[serde(default)]
        entries: Vec<RawCollectionEntry>,
        #[serde(default)]
        execution_mode: Option<String>,
        #[serde(default)]
        max_concurrent: Option<u32>,
        #[serde(default)]
        delay_seconds: Option<u32>,
    },
}

/// One run configuration row inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCollectionEntry {
    pub suite_path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub browser: String,
}

const fn default_enabled() -> bool {
    true
}
