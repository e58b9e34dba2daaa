//! Data model shared by the tcov engine, store and CLI.
//!
//! Two layers live here:
//! - [`raw`]: records exactly as the upstream project reader hands them over,
//!   before identifiers are resolved or paths normalized.
//! - [`model`]: the canonical per-run representation (test cases, suites,
//!   links, fan-out) that every engine stage consumes and produces.
//!
//! [`diagnostics`] holds the non-fatal warning values threaded through a run.

pub mod diagnostics;
pub mod model;
pub mod raw;

pub use diagnostics::{Warning, WarningKind};
pub use model::{
    CaseId, CaseSuiteLink, CollectionEntry, CollectionSettings, Corpus, FanoutEntry,
    FilterPredicate, LinkOrigin, LinkSet, Suite, SuiteBody, SuiteId, SuiteKind, Tag, TagCriterion,
    TestCase,
};
pub use raw::{RawCollectionEntry, RawSnapshot, RawSuite, RawSuiteBody, RawTags, RawTestCase};
