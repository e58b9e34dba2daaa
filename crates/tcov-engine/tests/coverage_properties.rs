use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tcov_engine::{RunContext, aggregate, build_links, resolve};
use tcov_types::{
    CaseId, FilterPredicate, Suite, SuiteBody, SuiteId, TagCriterion, TestCase,
};

const TAG_POOL: [&str; 5] = ["smoke", "api", "ui", "p1", "flaky"];
const FOLDERS: [&str; 4] = [
    "Test Cases/Auth",
    "Test Cases/Main",
    "Test Cases/Main/Deep",
    "Scenarios",
];

fn arb_case(index: usize) -> impl Strategy<Value = TestCase> {
    (
        0..FOLDERS.len(),
        proptest::collection::btree_set(0..TAG_POOL.len(), 0..3),
        "[A-Za-z]{1,6}",
    )
        .prop_map(move |(folder, tags, stem)| {
            let name = format!("{stem}{index}");
            TestCase {
                id: CaseId::new(format!("case-{index}")),
                folder_path: format!("{}/{name}", FOLDERS[folder]),
                name,
                tags: tags.into_iter().map(|i| TAG_POOL[i].to_owned()).collect(),
                parameterized: false,
                has_variables: false,
                updated_at: None,
            }
        })
}

fn arb_cases() -> impl Strategy<Value = Vec<TestCase>> {
    (0usize..12).prop_flat_map(|len| (0..len).map(arb_case).collect::<Vec<_>>())
}

fn arb_predicate() -> impl Strategy<Value = FilterPredicate> {
    (
        proptest::option::of((
            proptest::collection::btree_set(0..TAG_POOL.len(), 1..3),
            any::<bool>(),
        )),
        proptest::option::of("[a-z]{1,2}"),
    )
        .prop_map(|(tags, name)| FilterPredicate {
            tags: tags.map(|(tags, negated)| TagCriterion {
                tags: tags.into_iter().map(|i| TAG_POOL[i].to_owned()).collect(),
                negated,
            }),
            name,
        })
}

fn suites_for(cases: &[TestCase], predicate: &FilterPredicate, stride: usize) -> Vec<Suite> {
    let refs: Vec<String> = cases
        .iter()
        .step_by(stride.max(1))
        .map(|case| case.id.as_str().to_owned())
        .chain(std::iter::once("case-missing".to_owned()))
        .collect();
    vec![
        Suite {
            id: SuiteId::new("static"),
            name: "Static".to_owned(),
            path: "Test Suites/Static".to_owned(),
            body: SuiteBody::Static { case_refs: refs },
        },
        Suite {
            id: SuiteId::new("dynamic"),
            name: "Dynamic".to_owned(),
            path: "Test Suites/Dynamic".to_owned(),
            body: SuiteBody::Dynamic {
                filter_text: String::new(),
                predicate: predicate.clone(),
            },
        },
    ]
}

proptest! {
    #[test]
    fn prop_covered_plus_uncovered_is_total(
        cases in arb_cases(),
        predicate in arb_predicate(),
        stride in 1usize..4,
        depth in 1i64..4,
    ) {
        let suites = suites_for(&cases, &predicate, stride);
        let links = build_links(&cases, &suites, &mut RunContext::new());
        let report = aggregate(&cases, &suites, &links, depth)
            .map_err(|error| TestCaseError::fail(format!("case=aggregate error={error}")))?;
        let totals = &report.totals;

        if totals.covered_cases + totals.uncovered_cases != totals.total_cases {
            return Err(TestCaseError::fail(format!(
                "case=covered_plus_uncovered covered={} uncovered={} total={}",
                totals.covered_cases, totals.uncovered_cases, totals.total_cases
            )));
        }
        let bucketed: usize = report.modules.iter().map(|row| row.total_cases).sum();
        prop_assert_eq!(bucketed, cases.len(), "case=modules_partition_corpus");
    }

    #[test]
    fn prop_empty_predicate_resolves_to_nothing(cases in arb_cases()) {
        let resolved = resolve(&FilterPredicate::default(), &cases);
        prop_assert!(resolved.is_empty(), "case=empty_predicate matched={}", resolved.len());
    }

    #[test]
    fn prop_resolve_is_deterministic(cases in arb_cases(), predicate in arb_predicate()) {
        let first = resolve(&predicate, &cases);
        let mut reversed = cases.clone();
        reversed.reverse();
        let second = resolve(&predicate, &reversed);
        prop_assert_eq!(first, second, "case=resolve_order_independent");
    }

    #[test]
    fn prop_negated_tag_criterion_is_complement(
        cases in arb_cases(),
        tags in proptest::collection::btree_set(0..TAG_POOL.len(), 1..3),
    ) {
        let tags: BTreeSet<String> = tags.into_iter().map(|i| TAG_POOL[i].to_owned()).collect();
        let positive = FilterPredicate {
            tags: Some(TagCriterion { tags: tags.clone(), negated: false }),
            name: None,
        };
        let negative = FilterPredicate {
            tags: Some(TagCriterion { tags, negated: true }),
            name: None,
        };
        let matched = resolve(&positive, &cases);
        let unmatched = resolve(&negative, &cases);

        prop_assert!(matched.is_disjoint(&unmatched), "case=negation_disjoint");
        prop_assert_eq!(matched.len() + unmatched.len(), cases.len(), "case=negation_complete");
    }

    #[test]
    fn prop_build_links_is_idempotent(
        cases in arb_cases(),
        predicate in arb_predicate(),
        stride in 1usize..4,
    ) {
        let suites = suites_for(&cases, &predicate, stride);
        let mut first_ctx = RunContext::new();
        let mut second_ctx = RunContext::new();
        let first = build_links(&cases, &suites, &mut first_ctx);
        let second = build_links(&cases, &suites, &mut second_ctx);

        let first_set: BTreeSet<_> = first.links.into_iter().collect();
        let second_set: BTreeSet<_> = second.links.into_iter().collect();
        prop_assert_eq!(first_set, second_set, "case=links_idempotent");
        prop_assert_eq!(first_ctx.warnings(), second_ctx.warnings(), "case=warnings_idempotent");
        prop_assert_eq!(first_ctx.warnings().len(), 1, "case=one_dangling_reference");
    }
}
