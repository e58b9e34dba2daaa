//! Coverage aggregator.
//!
//! Pure function of the normalized corpus and its link set. Two execution
//! counts are kept apart from the distinct case counts:
//!
//! - `link_executions`: one per case-suite link, every suite counted.
//! - `total_executions`: links of suites that no enabled collection entry
//!   runs, plus every enabled fan-out entry's case count. A suite run by a
//!   collection is counted through the collection only, once per entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tcov_error::Result;
use tcov_types::{
    CaseId, FanoutEntry, LinkOrigin, LinkSet, Suite, SuiteBody, SuiteId, SuiteKind, TestCase,
};
use tracing::debug;

use crate::config::module_depth;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTotals {
    pub total_cases: usize,
    pub covered_cases: usize,
    pub uncovered_cases: usize,
    pub coverage_pct: f64,
    pub reused_cases: usize,
    pub link_executions: usize,
    pub fanout_executions: usize,
    pub total_executions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleCoverage {
    pub module: String,
    pub total_cases: usize,
    pub covered_cases: usize,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReuseRow {
    pub case_id: CaseId,
    pub name: String,
    pub folder_path: String,
    pub usage_count: usize,
    /// Names of the distinct suites, ascending.
    pub suites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMembership {
    pub case_id: CaseId,
    pub name: String,
    pub folder_path: String,
    /// Distinct suites the case links to, by identifier.
    pub suite_ids: Vec<SuiteId>,
}

impl CaseMembership {
    pub fn is_covered(&self) -> bool {
        !self.suite_ids.is_empty()
    }
}

/// Case counts of a static or dynamic suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteCaseCount {
    pub suite_id: SuiteId,
    pub name: String,
    pub path: String,
    pub kind: SuiteKind,
    /// Distinct cases linked to the suite.
    pub case_count: usize,
    /// Links including repeated static listings.
    pub link_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFanout {
    pub collection_id: SuiteId,
    pub name: String,
    pub execution_mode: String,
    pub max_concurrent: u32,
    pub delay_seconds: u32,
    pub entries: Vec<FanoutEntry>,
    pub enabled_entries: usize,
    pub executions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub module_depth: usize,
    pub totals: CoverageTotals,
    pub modules: Vec<ModuleCoverage>,
    pub reuse: Vec<ReuseRow>,
    pub membership: Vec<CaseMembership>,
    pub suites: Vec<SuiteCaseCount>,
    pub collections: Vec<CollectionFanout>,
}

/// `part / total` as a percentage rounded half-up to one decimal place.
/// An empty total is 0.0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let part = part as u128;
    let total = total as u128;
    let tenths = (part * 2000 + total) / (2 * total);
    tenths as f64 / 10.0
}

/// Leading `depth` segments of a folder path; shorter paths are their own key.
pub fn module_key(folder_path: &str, depth: usize) -> String {
    folder_path
        .split('/')
        .take(depth)
        .collect::<Vec<_>>()
        .join("/")
}

pub fn aggregate(
    cases: &[TestCase],
    suites: &[Suite],
    links: &LinkSet,
    depth: i64,
) -> Result<CoverageReport> {
    let depth = module_depth(depth)?;

    let mut usage: HashMap<&CaseId, BTreeSet<&SuiteId>> = HashMap::new();
    let mut suite_cases: HashMap<&SuiteId, BTreeSet<&CaseId>> = HashMap::new();
    let mut suite_links: HashMap<&SuiteId, usize> = HashMap::new();
    for link in &links.links {
        usage.entry(&link.case_id).or_default().insert(&link.suite_id);
        suite_cases
            .entry(&link.suite_id)
            .or_default()
            .insert(&link.case_id);
        *suite_links.entry(&link.suite_id).or_default() += 1;
    }
    let suite_names: HashMap<&SuiteId, &str> = suites
        .iter()
        .map(|suite| (&suite.id, suite.name.as_str()))
        .collect();

    let mut membership: Vec<CaseMembership> = cases
        .iter()
        .map(|case| CaseMembership {
            case_id: case.id.clone(),
            name: case.name.clone(),
            folder_path: case.folder_path.clone(),
            suite_ids: usage
                .get(&case.id)
                .map(|ids| ids.iter().map(|id| (*id).clone()).collect())
                .unwrap_or_default(),
        })
        .collect();
    membership.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.case_id.cmp(&b.case_id)));

    let total_cases = cases.len();
    let covered_cases = membership.iter().filter(|row| row.is_covered()).count();

    let mut buckets: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for row in &membership {
        let bucket = buckets.entry(module_key(&row.folder_path, depth)).or_default();
        bucket.0 += 1;
        if row.is_covered() {
            bucket.1 += 1;
        }
    }
    let mut modules: Vec<ModuleCoverage> = buckets
        .into_iter()
        .map(|(module, (total, covered))| ModuleCoverage {
            module,
            total_cases: total,
            covered_cases: covered,
            coverage_pct: percentage(covered, total),
        })
        .collect();
    modules.sort_by(|a, b| {
        b.total_cases
            .cmp(&a.total_cases)
            .then_with(|| a.module.cmp(&b.module))
    });

    let mut reuse: Vec<ReuseRow> = membership
        .iter()
        .filter(|row| row.suite_ids.len() >= 2)
        .map(|row| {
            let mut names: Vec<String> = row
                .suite_ids
                .iter()
                .map(|id| {
                    suite_names
                        .get(id)
                        .map_or_else(|| id.to_string(), |name| (*name).to_owned())
                })
                .collect();
            names.sort();
            ReuseRow {
                case_id: row.case_id.clone(),
                name: row.name.clone(),
                folder_path: row.folder_path.clone(),
                usage_count: row.suite_ids.len(),
                suites: names,
            }
        })
        .collect();
    reuse.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.case_id.cmp(&b.case_id))
    });

    let suite_counts: Vec<SuiteCaseCount> = suites
        .iter()
        .filter(|suite| suite.kind() != SuiteKind::Collection)
        .map(|suite| SuiteCaseCount {
            suite_id: suite.id.clone(),
            name: suite.name.clone(),
            path: suite.path.clone(),
            kind: suite.kind(),
            case_count: suite_cases.get(&suite.id).map_or(0, BTreeSet::len),
            link_count: suite_links.get(&suite.id).copied().unwrap_or(0),
        })
        .collect();

    let mut fanout_by_collection: HashMap<&SuiteId, Vec<FanoutEntry>> = HashMap::new();
    for entry in &links.fanout {
        fanout_by_collection
            .entry(&entry.collection_id)
            .or_default()
            .push(entry.clone());
    }
    let collections: Vec<CollectionFanout> = suites
        .iter()
        .filter_map(|suite| {
            let SuiteBody::Collection { settings, .. } = &suite.body else {
                return None;
            };
            let entries = fanout_by_collection.remove(&suite.id).unwrap_or_default();
            Some(CollectionFanout {
                collection_id: suite.id.clone(),
                name: suite.name.clone(),
                execution_mode: settings.execution_mode.clone(),
                max_concurrent: settings.max_concurrent,
                delay_seconds: settings.delay_seconds,
                enabled_entries: entries.iter().filter(|entry| entry.enabled).count(),
                executions: entries.iter().map(FanoutEntry::executions).sum(),
                entries,
            })
        })
        .collect();

    let orchestrated: BTreeSet<&SuiteId> = links
        .fanout
        .iter()
        .filter(|entry| entry.enabled)
        .filter_map(|entry| entry.suite_id.as_ref())
        .collect();
    let link_executions = links.links.len();
    let standalone_executions = links
        .links
        .iter()
        .filter(|link| !orchestrated.contains(&link.suite_id))
        .count();
    let fanout_executions: usize = links.fanout.iter().map(FanoutEntry::executions).sum();

    let totals = CoverageTotals {
        total_cases,
        covered_cases,
        uncovered_cases: total_cases - covered_cases,
        coverage_pct: percentage(covered_cases, total_cases),
        reused_cases: reuse.len(),
        link_executions,
        fanout_executions,
        total_executions: standalone_executions + fanout_executions,
    };
    debug!(
        total = totals.total_cases,
        covered = totals.covered_cases,
        executions = totals.total_executions,
        "coverage aggregated"
    );

    Ok(CoverageReport {
        module_depth: depth,
        totals,
        modules,
        reuse,
        membership,
        suites: suite_counts,
        collections,
    })
}

/// Links of a given origin; used by reports that split explicit from
/// filter-resolved membership.
pub fn count_links(links: &LinkSet, origin: LinkOrigin) -> usize {
    links.links.iter().filter(|link| link.origin == origin).count()
}

#[cfg(test)]
mod tests {
    use tcov_error::TcovError;
    use tcov_types::CaseSuiteLink;

    use super::*;

    fn case(id: &str, folder_path: &str) -> TestCase {
        TestCase {
            id: CaseId::new(id),
            name: folder_path.rsplit('/').next().unwrap_or(id).to_owned(),
            folder_path: folder_path.to_owned(),
            tags: BTreeSet::new(),
            parameterized: false,
            has_variables: false,
            updated_at: None,
        }
    }

    fn suite(id: &str) -> Suite {
        Suite {
            id: SuiteId::new(id),
            name: id.to_owned(),
            path: format!("Test Suites/{id}"),
            body: SuiteBody::Static {
                case_refs: Vec::new(),
            },
        }
    }

    fn link(case_id: &str, suite_id: &str) -> CaseSuiteLink {
        CaseSuiteLink {
            case_id: CaseId::new(case_id),
            suite_id: SuiteId::new(suite_id),
            origin: LinkOrigin::Explicit,
        }
    }

    #[test]
    fn percentage_rounds_half_up_to_one_decimal() {
        let cases = [
            (3, 4, 75.0),
            (1, 3, 33.3),
            (2, 3, 66.7),
            (1, 8, 12.5),
            (1, 16, 6.3),
            (0, 5, 0.0),
            (5, 5, 100.0),
            (0, 0, 0.0),
        ];
        for (part, total, expected) in cases {
            assert_eq!(percentage(part, total), expected, "case={part}/{total}");
        }
    }

    #[test]
    fn module_key_truncates_or_keeps_short_paths() {
        assert_eq!(module_key("Test Cases/Main/TC1", 1), "Test Cases");
        assert_eq!(module_key("Test Cases/Main/TC1", 2), "Test Cases/Main");
        assert_eq!(module_key("Test Cases/TC1", 5), "Test Cases/TC1");
    }

    #[test]
    fn non_positive_depth_is_rejected() {
        let error = aggregate(&[], &[], &LinkSet::default(), 0).expect_err("depth 0");
        assert!(matches!(error, TcovError::InvalidModuleDepth { depth: 0 }));
    }

    #[test]
    fn modules_sorted_by_size_then_key() {
        let cases = vec![
            case("a", "Test Cases/Beta/A"),
            case("b", "Test Cases/Alpha/B"),
            case("c", "Test Cases/Gamma/C"),
            case("d", "Test Cases/Gamma/D"),
        ];
        let links = LinkSet {
            links: vec![link("c", "S1")],
            fanout: Vec::new(),
        };
        let report = aggregate(&cases, &[suite("S1")], &links, 2).expect("aggregate");

        let keys: Vec<&str> = report.modules.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Test Cases/Gamma", "Test Cases/Alpha", "Test Cases/Beta"]
        );
        assert_eq!(report.modules[0].coverage_pct, 50.0);
    }

    #[test]
    fn reuse_counts_distinct_suites_only() {
        let cases = vec![case("a", "Test Cases/A"), case("b", "Test Cases/B")];
        let links = LinkSet {
            links: vec![
                link("a", "S1"),
                link("a", "S2"),
                link("b", "S1"),
                link("b", "S1"),
            ],
            fanout: Vec::new(),
        };
        let report =
            aggregate(&cases, &[suite("S1"), suite("S2")], &links, 1).expect("aggregate");

        assert_eq!(report.totals.reused_cases, 1);
        assert_eq!(report.reuse[0].case_id.as_str(), "a");
        assert_eq!(report.reuse[0].suites, vec!["S1".to_owned(), "S2".to_owned()]);
        assert_eq!(report.suites[0].case_count, 2);
        assert_eq!(report.suites[0].link_count, 3);
        assert_eq!(report.totals.link_executions, 4);
        assert_eq!(report.totals.total_executions, 4);
    }

    #[test]
    fn reuse_rows_sorted_by_usage_then_name_then_id() {
        let cases = vec![
            case("b", "Test Cases/Beta"),
            case("z", "Test Cases/Zulu"),
            case("a", "Test Cases/Alpha"),
            case("d2", "Other/Dup"),
            case("d1", "Test Cases/Dup"),
        ];
        let links = LinkSet {
            links: vec![
                link("b", "S1"),
                link("b", "S2"),
                link("d2", "S1"),
                link("d2", "S3"),
                link("z", "S1"),
                link("z", "S2"),
                link("z", "S3"),
                link("a", "S2"),
                link("a", "S3"),
                link("d1", "S2"),
                link("d1", "S3"),
            ],
            fanout: Vec::new(),
        };
        let suites = [suite("S1"), suite("S2"), suite("S3")];
        let report = aggregate(&cases, &suites, &links, 1).expect("aggregate");

        let order: Vec<(&str, usize)> = report
            .reuse
            .iter()
            .map(|row| (row.case_id.as_str(), row.usage_count))
            .collect();
        assert_eq!(
            order,
            vec![("z", 3), ("a", 2), ("b", 2), ("d1", 2), ("d2", 2)],
            "case=usage_desc_name_asc_id_asc"
        );
        assert_eq!(report.totals.reused_cases, 5);
    }

    #[test]
    fn orchestrated_suites_count_through_fanout_only() {
        let cases = vec![case("a", "Test Cases/A"), case("b", "Test Cases/B")];
        let entry = |profile: &str, enabled: bool| FanoutEntry {
            collection_id: SuiteId::new("C1"),
            suite_path: "Test Suites/S1".to_owned(),
            suite_id: Some(SuiteId::new("S1")),
            group: String::new(),
            profile: profile.to_owned(),
            browser: String::new(),
            enabled,
            case_count: 2,
        };
        let links = LinkSet {
            links: vec![link("a", "S1"), link("b", "S1"), link("a", "S2")],
            fanout: vec![entry("P1", true), entry("P2", true), entry("P3", false)],
        };
        let collection = Suite {
            id: SuiteId::new("C1"),
            name: "Nightly".to_owned(),
            path: "Test Suites/Nightly".to_owned(),
            body: SuiteBody::Collection {
                entries: Vec::new(),
                settings: tcov_types::CollectionSettings::default(),
            },
        };
        let report = aggregate(&cases, &[suite("S1"), suite("S2"), collection], &links, 1)
            .expect("aggregate");

        assert_eq!(report.totals.fanout_executions, 4);
        assert_eq!(report.totals.total_executions, 5);
        assert_eq!(report.collections.len(), 1);
        assert_eq!(report.collections[0].enabled_entries, 2);
        assert_eq!(report.collections[0].executions, 4);
        assert_eq!(report.collections[0].execution_mode, "SEQUENTIAL");
        assert_eq!(count_links(&links, LinkOrigin::Explicit), 3);
    }
}
