//! Link builder: the case-suite relation and the collection fan-out relation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tcov_types::{
    CaseId, CaseSuiteLink, FanoutEntry, LinkOrigin, LinkSet, Suite, SuiteBody, SuiteId,
    SuiteKind, TestCase, WarningKind,
};
use tracing::debug;

use crate::context::RunContext;
use crate::filter::resolve;
use crate::normalize::{UNFILED_FOLDER, normalize_path};

/// Case lookup by identifier, then by normalized path.
struct CaseIndex<'a> {
    by_id: HashMap<&'a str, &'a CaseId>,
    by_path: HashMap<&'a str, &'a CaseId>,
}

impl<'a> CaseIndex<'a> {
    fn new(cases: &'a [TestCase]) -> Self {
        let mut by_id = HashMap::with_capacity(cases.len());
        let mut by_path = HashMap::with_capacity(cases.len());
        for case in cases {
            by_id.entry(case.id.as_str()).or_insert(&case.id);
            if case.folder_path != UNFILED_FOLDER {
                by_path.entry(case.folder_path.as_str()).or_insert(&case.id);
            }
        }
        Self { by_id, by_path }
    }

    fn lookup(&self, reference: &str) -> Option<&'a CaseId> {
        self.by_id
            .get(reference)
            .or_else(|| self.by_path.get(normalize_path(reference, None).as_str()))
            .copied()
    }
}

/// Suite lookup by identifier, then by normalized path.
struct SuiteIndex<'a> {
    by_id: HashMap<&'a str, &'a Suite>,
    by_path: HashMap<&'a str, &'a Suite>,
}

impl<'a> SuiteIndex<'a> {
    fn new(suites: &'a [Suite]) -> Self {
        let mut by_id = HashMap::with_capacity(suites.len());
        let mut by_path = HashMap::with_capacity(suites.len());
        for suite in suites {
            by_id.entry(suite.id.as_str()).or_insert(suite);
            by_path.entry(suite.path.as_str()).or_insert(suite);
        }
        Self { by_id, by_path }
    }

    fn lookup(&self, reference: &str) -> Option<&'a Suite> {
        self.by_id
            .get(reference)
            .or_else(|| self.by_path.get(normalize_path(reference, None).as_str()))
            .copied()
    }
}

/// Distinct cases linked to each suite.
pub fn suite_case_sets(links: &[CaseSuiteLink]) -> BTreeMap<SuiteId, BTreeSet<CaseId>> {
    let mut sets: BTreeMap<SuiteId, BTreeSet<CaseId>> = BTreeMap::new();
    for link in links {
        sets.entry(link.suite_id.clone())
            .or_default()
            .insert(link.case_id.clone());
    }
    sets
}

/// Build every case-suite link and every fan-out entry.
///
/// Static suites contribute one explicit link per resolvable listing
/// (repeated listings repeat the link), dynamic suites one filter link per
/// matched case in identifier order. Collection entries are resolved last,
/// against the case sets of the links just built. Unresolvable references
/// are dropped with a `DanglingReference` warning.
pub fn build_links(cases: &[TestCase], suites: &[Suite], ctx: &mut RunContext) -> LinkSet {
    let case_index = CaseIndex::new(cases);
    let mut links = Vec::new();

    for suite in suites {
        match &suite.body {
            SuiteBody::Static { case_refs } => {
                for reference in case_refs {
                    if let Some(case_id) = case_index.lookup(reference) {
                        links.push(CaseSuiteLink {
                            case_id: case_id.clone(),
                            suite_id: suite.id.clone(),
                            origin: LinkOrigin::Explicit,
                        });
                    } else {
                        ctx.warn(
                            WarningKind::DanglingReference,
                            suite.name.as_str(),
                            format!("unknown case reference '{reference}'"),
                        );
                    }
                }
            }
            SuiteBody::Dynamic { predicate, .. } => {
                let matched = resolve(predicate, cases);
                debug!(suite = %suite.id, matched = matched.len(), "dynamic suite resolved");
                links.extend(matched.into_iter().map(|case_id| CaseSuiteLink {
                    case_id,
                    suite_id: suite.id.clone(),
                    origin: LinkOrigin::Filter,
                }));
            }
            SuiteBody::Collection { .. } => {}
        }
    }

    let case_sets = suite_case_sets(&links);
    let suite_index = SuiteIndex::new(suites);
    let mut fanout = Vec::new();

    for collection in suites {
        let SuiteBody::Collection { entries, .. } = &collection.body else {
            continue;
        };
        for entry in entries {
            let target = match suite_index.lookup(&entry.suite_path) {
                Some(target) if target.kind() == SuiteKind::Collection => {
                    ctx.warn(
                        WarningKind::DanglingReference,
                        collection.name.as_str(),
                        format!(
                            "entry '{}' references a collection, not a suite",
                            entry.suite_path
                        ),
                    );
                    None
                }
                Some(target) => Some(target),
                None => {
                    ctx.warn(
                        WarningKind::DanglingReference,
                        collection.name.as_str(),
                        format!("unknown suite reference '{}'", entry.suite_path),
                    );
                    None
                }
            };
            let case_count = target
                .and_then(|suite| case_sets.get(&suite.id))
                .map_or(0, BTreeSet::len);
            fanout.push(FanoutEntry {
                collection_id: entry.collection_id.clone(),
                suite_path: entry.suite_path.clone(),
                suite_id: target.map(|suite| suite.id.clone()),
                group: entry.group.clone(),
                profile: entry.profile.clone(),
                browser: entry.browser.clone(),
                enabled: entry.enabled,
                case_count,
            });
        }
    }

    debug!(
        links = links.len(),
        fanout = fanout.len(),
        "link set built"
    );
    LinkSet { links, fanout }
}
