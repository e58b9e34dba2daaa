//! Report insights derived from the corpus and its coverage: tag usage,
//! suite kind counts, complexity, priority and test type distributions,
//! suite inventory, uncovered cases and recent activity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tcov_types::{CaseId, LinkOrigin, LinkSet, Suite, SuiteId, SuiteKind, Tag, TestCase};

use crate::config::{EngineConfig, TagLabel};
use crate::coverage::{CoverageReport, count_links, percentage};

/// Label of cases that carry none of the configured priority tags.
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";
/// Label of cases that carry none of the configured test type tags.
pub const OTHER_LABEL: &str = "Other";

/// Characters of `updated_at` that form the calendar date.
const DATE_PREFIX_LEN: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteKindCounts {
    pub static_suites: usize,
    pub dynamic_suites: usize,
    pub collections: usize,
    pub total: usize,
    pub explicit_links: usize,
    pub filter_links: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complexity {
    pub parameterized_cases: usize,
    pub parameterized_pct: f64,
    pub variable_cases: usize,
    pub variable_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub label: String,
    pub cases: usize,
    pub covered_cases: usize,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub suite_id: SuiteId,
    pub name: String,
    pub kind: SuiteKind,
    pub case_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteInventory {
    /// Zero-case suites, by name.
    pub empty: Vec<InventoryRow>,
    /// Suites with cases, largest first.
    pub active: Vec<InventoryRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncoveredCase {
    pub case_id: CaseId,
    pub name: String,
    pub folder_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub date: String,
    pub cases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub distinct_tags: usize,
    pub top_tags: Vec<Tag>,
    pub suite_kinds: SuiteKindCounts,
    pub complexity: Complexity,
    pub priority_distribution: Vec<DistributionRow>,
    pub test_type_distribution: Vec<DistributionRow>,
    pub suite_inventory: SuiteInventory,
    pub uncovered: Vec<UncoveredCase>,
    pub recent_activity: Vec<ActivityRow>,
}

/// Usage count of every tag, most used first, ties by name.
pub fn tag_usage(cases: &[TestCase]) -> Vec<Tag> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in cases.iter().flat_map(|case| &case.tags) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut tags: Vec<Tag> = counts
        .into_iter()
        .map(|(name, usage_count)| Tag {
            name: name.to_owned(),
            usage_count,
        })
        .collect();
    tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.name.cmp(&b.name)));
    tags
}

fn classify<'a>(case: &TestCase, labels: &'a [TagLabel], fallback: &'a str) -> &'a str {
    labels
        .iter()
        .find(|entry| case.tags.contains(&entry.tag))
        .map_or(fallback, |entry| entry.label.as_str())
}

/// Per-label case and covered counts, ordered by label.
fn distribution(
    cases: &[TestCase],
    covered: &BTreeSet<&CaseId>,
    labels: &[TagLabel],
    fallback: &str,
) -> Vec<DistributionRow> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for case in cases {
        let slot = counts.entry(classify(case, labels, fallback)).or_default();
        slot.0 += 1;
        if covered.contains(&case.id) {
            slot.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(label, (total, covered))| DistributionRow {
            label: label.to_owned(),
            cases: total,
            covered_cases: covered,
            coverage_pct: percentage(covered, total),
        })
        .collect()
}

fn priority_distribution(
    cases: &[TestCase],
    covered: &BTreeSet<&CaseId>,
    labels: &[TagLabel],
) -> Vec<DistributionRow> {
    let mut rows = distribution(cases, covered, labels, UNCLASSIFIED_LABEL);
    let rank = |label: &str| {
        labels
            .iter()
            .position(|entry| entry.label == label)
            .unwrap_or(labels.len())
    };
    rows.sort_by_key(|row| rank(&row.label));
    rows
}

fn test_type_distribution(
    cases: &[TestCase],
    covered: &BTreeSet<&CaseId>,
    labels: &[TagLabel],
) -> Vec<DistributionRow> {
    let mut rows = distribution(cases, covered, labels, OTHER_LABEL);
    rows.sort_by(|a, b| b.cases.cmp(&a.cases).then_with(|| a.label.cmp(&b.label)));
    rows
}

fn suite_inventory(coverage: &CoverageReport) -> SuiteInventory {
    let (mut empty, mut active): (Vec<InventoryRow>, Vec<InventoryRow>) = coverage
        .suites
        .iter()
        .map(|suite| InventoryRow {
            suite_id: suite.suite_id.clone(),
            name: suite.name.clone(),
            kind: suite.kind,
            case_count: suite.case_count,
        })
        .partition(|row| row.case_count == 0);
    empty.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.suite_id.cmp(&b.suite_id)));
    active.sort_by(|a, b| {
        b.case_count
            .cmp(&a.case_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.suite_id.cmp(&b.suite_id))
    });
    SuiteInventory { empty, active }
}

fn recent_activity(cases: &[TestCase], limit: usize) -> Vec<ActivityRow> {
    let mut by_date: BTreeMap<String, usize> = BTreeMap::new();
    for updated_at in cases.iter().filter_map(|case| case.updated_at.as_deref()) {
        let date: String = updated_at.chars().take(DATE_PREFIX_LEN).collect();
        *by_date.entry(date).or_default() += 1;
    }
    by_date
        .into_iter()
        .rev()
        .take(limit)
        .map(|(date, cases)| ActivityRow { date, cases })
        .collect()
}

pub fn build_insights(
    cases: &[TestCase],
    suites: &[Suite],
    links: &LinkSet,
    coverage: &CoverageReport,
    config: &EngineConfig,
) -> Insights {
    let covered: BTreeSet<&CaseId> = coverage
        .membership
        .iter()
        .filter(|row| row.is_covered())
        .map(|row| &row.case_id)
        .collect();

    let tags = tag_usage(cases);
    let distinct_tags = tags.len();
    let top_tags = tags.into_iter().take(config.top_tags_limit).collect();

    let mut suite_kinds = SuiteKindCounts {
        total: suites.len(),
        explicit_links: count_links(links, LinkOrigin::Explicit),
        filter_links: count_links(links, LinkOrigin::Filter),
        ..SuiteKindCounts::default()
    };
    for suite in suites {
        match suite.kind() {
            SuiteKind::Static => suite_kinds.static_suites += 1,
            SuiteKind::Dynamic => suite_kinds.dynamic_suites += 1,
            SuiteKind::Collection => suite_kinds.collections += 1,
        }
    }

    let parameterized_cases = cases.iter().filter(|case| case.parameterized).count();
    let variable_cases = cases.iter().filter(|case| case.has_variables).count();
    let complexity = Complexity {
        parameterized_cases,
        parameterized_pct: percentage(parameterized_cases, cases.len()),
        variable_cases,
        variable_pct: percentage(variable_cases, cases.len()),
    };

    let mut uncovered: Vec<UncoveredCase> = coverage
        .membership
        .iter()
        .filter(|row| !row.is_covered())
        .map(|row| UncoveredCase {
            case_id: row.case_id.clone(),
            name: row.name.clone(),
            folder_path: row.folder_path.clone(),
        })
        .collect();
    uncovered.sort_by(|a, b| {
        a.folder_path
            .cmp(&b.folder_path)
            .then_with(|| a.name.cmp(&b.name))
    });

    Insights {
        distinct_tags,
        top_tags,
        suite_kinds,
        complexity,
        priority_distribution: priority_distribution(cases, &covered, &config.priority_tags),
        test_type_distribution: test_type_distribution(cases, &covered, &config.test_type_tags),
        suite_inventory: suite_inventory(coverage),
        uncovered,
        recent_activity: recent_activity(cases, config.recent_activity_limit),
    }
}
