//! Entity normalizer: raw reader records to canonical model values.
//!
//! Identifiers are resolved to one addressing scheme: the explicit GUID when
//! present, otherwise the normalized project-relative path. A record with
//! neither is rejected with [`TcovError::MissingIdentifier`] and dropped from
//! the run with a warning.

use std::collections::{BTreeSet, HashSet};

use tcov_error::{Result, TcovError};
use tcov_types::{
    CaseId, CollectionEntry, CollectionSettings, Corpus, RawSnapshot, RawSuite, RawSuiteBody,
    RawTags, RawTestCase, Suite, SuiteBody, SuiteId, TestCase, WarningKind,
};
use tracing::debug;

use crate::context::RunContext;
use crate::filter::parse_filter_or_empty;

/// Folder assigned to a case whose record has a GUID but no path.
pub const UNFILED_FOLDER: &str = "(unfiled)";

/// Longest suffix treated as a file extension.
const MAX_EXTENSION_LEN: usize = 8;

/// Part of a slash-unified path below `project_root`, or `None` when the
/// path does not start with the root.
fn strip_root<'a>(unified: &'a str, project_root: Option<&str>) -> Option<&'a str> {
    let root = project_root?.trim().replace('\\', "/");
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return None;
    }
    if unified == root {
        return Some("");
    }
    unified
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Normalize a reader path: forward slashes, project-root prefix removed,
/// empty and `.` segments dropped, file extension stripped.
pub fn normalize_path(raw: &str, project_root: Option<&str>) -> String {
    let unified = raw.trim().replace('\\', "/");
    let relative = strip_root(&unified, project_root).unwrap_or(&unified);

    let mut segments: Vec<&str> = relative
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if let Some(last) = segments.last_mut() {
        *last = strip_extension(last);
    }
    segments.join("/")
}

/// Prepare a static or collection reference for lookup.
///
/// References are kept as authored so identifiers match exactly; only a
/// reference spelled as a path under `project_root` is rewritten to its
/// project-relative form.
pub fn normalize_reference(raw: &str, project_root: Option<&str>) -> String {
    let trimmed = raw.trim();
    let unified = trimmed.replace('\\', "/");
    if strip_root(&unified, project_root).is_some() {
        normalize_path(trimmed, project_root)
    } else {
        trimmed.to_owned()
    }
}

/// Strip a short, alphabetic suffix such as `.tc`; dotted names like
/// `Release 1.2` keep their suffix.
fn strip_extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(dot) if dot > 0 => {
            let extension = &segment[dot + 1..];
            if !extension.is_empty()
                && extension.len() <= MAX_EXTENSION_LEN
                && extension.chars().all(|ch| ch.is_ascii_alphabetic())
            {
                &segment[..dot]
            } else {
                segment
            }
        }
        _ => segment,
    }
}

/// Split raw tags into a set. Blank items and blank strings yield no tags.
pub fn parse_tags(raw: Option<&RawTags>) -> BTreeSet<String> {
    let items: Vec<&str> = match raw {
        None => Vec::new(),
        Some(RawTags::Delimited(text)) => vec![text.as_str()],
        Some(RawTags::List(list)) => list.iter().map(String::as_str).collect(),
    };
    items
        .into_iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "<unnamed>"
    } else {
        name
    }
}

/// Resolve identifier and path of a record; the path is `None` when blank.
fn resolve_identity(
    name: &str,
    identifier: Option<&String>,
    path: Option<&String>,
    project_root: Option<&str>,
) -> Result<(String, Option<String>)> {
    let path = path
        .map(|raw| normalize_path(raw, project_root))
        .filter(|normalized| !normalized.is_empty());
    match (non_blank(identifier), path) {
        (Some(id), path) => Ok((id, path)),
        (None, Some(path)) => Ok((path.clone(), Some(path))),
        (None, None) => Err(TcovError::missing_identifier(display_name(name))),
    }
}

pub fn normalize_test_case(raw: &RawTestCase, project_root: Option<&str>) -> Result<TestCase> {
    let (id, path) = resolve_identity(
        &raw.name,
        raw.identifier.as_ref(),
        raw.path.as_ref(),
        project_root,
    )?;
    Ok(TestCase {
        id: CaseId::new(id),
        name: raw.name.trim().to_owned(),
        folder_path: path.unwrap_or_else(|| UNFILED_FOLDER.to_owned()),
        tags: parse_tags(raw.tags.as_ref()),
        parameterized: raw.has_test_data_links,
        has_variables: raw.has_variables,
        updated_at: non_blank(raw.updated_at.as_ref()),
    })
}

pub fn normalize_suite(
    raw: &RawSuite,
    project_root: Option<&str>,
    ctx: &mut RunContext,
) -> Result<Suite> {
    let (id, path) = resolve_identity(
        &raw.name,
        raw.identifier.as_ref(),
        raw.path.as_ref(),
        project_root,
    )?;
    let id = SuiteId::new(id);
    let name = raw.name.trim().to_owned();

    let body = match &raw.body {
        RawSuiteBody::Static { case_refs } => SuiteBody::Static {
            case_refs: case_refs
                .iter()
                .map(|reference| normalize_reference(reference, project_root))
                .filter(|reference| !reference.is_empty())
                .collect(),
        },
        RawSuiteBody::Dynamic { filter_text } => {
            let filter_text = filter_text.as_deref().unwrap_or_default().trim().to_owned();
            let predicate = parse_filter_or_empty(&filter_text, display_name(&name), ctx);
            SuiteBody::Dynamic {
                filter_text,
                predicate,
            }
        }
        RawSuiteBody::Collection {
            entries,
            execution_mode,
            max_concurrent,
            delay_seconds,
        } => {
            let defaults = CollectionSettings::default();
            let settings = CollectionSettings {
                execution_mode: non_blank(execution_mode.as_ref())
                    .map_or(defaults.execution_mode, |mode| mode.to_ascii_uppercase()),
                max_concurrent: max_concurrent.unwrap_or(defaults.max_concurrent),
                delay_seconds: delay_seconds.unwrap_or(defaults.delay_seconds),
            };
            let entries = entries
                .iter()
                .map(|entry| CollectionEntry {
                    collection_id: id.clone(),
                    suite_path: normalize_reference(&entry.suite_path, project_root),
                    enabled: entry.enabled,
                    group: entry.group.trim().to_owned(),
                    profile: entry.profile.trim().to_owned(),
                    browser: entry.browser.trim().to_owned(),
                })
                .collect();
            SuiteBody::Collection { entries, settings }
        }
    };

    Ok(Suite {
        path: path.unwrap_or_else(|| id.as_str().to_owned()),
        id,
        name,
        body,
    })
}

/// Normalize a whole snapshot. Rejected and duplicate records are dropped
/// with warnings; the first record with a given identifier wins.
pub fn normalize_snapshot(
    snapshot: &RawSnapshot,
    project_root: Option<&str>,
    ctx: &mut RunContext,
) -> Corpus {
    let project_root = project_root.or(snapshot.project_root.as_deref());
    let mut corpus = Corpus::default();

    let mut seen_cases = HashSet::new();
    for raw in &snapshot.test_cases {
        match normalize_test_case(raw, project_root) {
            Ok(case) => {
                if seen_cases.insert(case.id.clone()) {
                    corpus.cases.push(case);
                } else {
                    ctx.warn(
                        WarningKind::DuplicateIdentifier,
                        display_name(&raw.name),
                        format!("test case identifier '{}' already seen", case.id),
                    );
                }
            }
            Err(error) => {
                ctx.warn(
                    WarningKind::MissingIdentifier,
                    display_name(&raw.name),
                    error.to_string(),
                );
            }
        }
    }

    let mut seen_suites = HashSet::new();
    for raw in &snapshot.suites {
        match normalize_suite(raw, project_root, ctx) {
            Ok(suite) => {
                if seen_suites.insert(suite.id.clone()) {
                    corpus.suites.push(suite);
                } else {
                    ctx.warn(
                        WarningKind::DuplicateIdentifier,
                        display_name(&raw.name),
                        format!("suite identifier '{}' already seen", suite.id),
                    );
                }
            }
            Err(error) => {
                ctx.warn(
                    WarningKind::MissingIdentifier,
                    display_name(&raw.name),
                    error.to_string(),
                );
            }
        }
    }

    debug!(
        cases = corpus.cases.len(),
        suites = corpus.suites.len(),
        "snapshot normalized"
    );
    corpus
}
