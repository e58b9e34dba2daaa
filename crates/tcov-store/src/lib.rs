//! SQLite persistence for tcov analysis runs.
//!
//! The store keeps one point-in-time snapshot: [`write_run`] replaces whatever
//! a previous run left behind. The table shape is fixed (see [`schema`]) so
//! that it can be queried without going through the report renderer.

pub mod schema;

use std::collections::BTreeMap;

use rusqlite::params;
use tcov_types::{Corpus, LinkSet, SuiteBody};
use thiserror::Error;
use tracing::info;

pub use schema::{TABLES, create_schema, open};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Process exit code; store failures are I/O failures.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Sqlite(_) => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Rows written by one [`write_run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub test_cases: usize,
    pub tags: usize,
    pub case_tags: usize,
    pub suites: usize,
    pub case_links: usize,
    pub collection_links: usize,
}

/// Replace the stored snapshot with `corpus` and `links` in one transaction.
pub fn write_run(
    conn: &mut rusqlite::Connection,
    corpus: &Corpus,
    links: &LinkSet,
) -> Result<StoreSummary> {
    let tx = conn.transaction()?;
    for table in TABLES.iter().rev() {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
    }

    let mut summary = StoreSummary::default();
    {
        let mut insert_case = tx.prepare(
            "INSERT INTO test_cases (id, name, folder_path, parameterized, has_variables, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for case in &corpus.cases {
            insert_case.execute(params![
                case.id.as_str(),
                case.name,
                case.folder_path,
                case.parameterized,
                case.has_variables,
                case.updated_at,
            ])?;
            summary.test_cases += 1;
        }

        let mut usage: BTreeMap<&str, usize> = BTreeMap::new();
        for tag in corpus.cases.iter().flat_map(|case| &case.tags) {
            *usage.entry(tag.as_str()).or_default() += 1;
        }
        let mut insert_tag =
            tx.prepare("INSERT INTO tags (name, usage_count) VALUES (?1, ?2)")?;
        let mut tag_ids: BTreeMap<&str, i64> = BTreeMap::new();
        for (name, usage_count) in usage {
            insert_tag.execute(params![name, usage_count])?;
            tag_ids.insert(name, tx.last_insert_rowid());
            summary.tags += 1;
        }

        let mut insert_case_tag =
            tx.prepare("INSERT INTO test_case_tags (test_case_id, tag_id) VALUES (?1, ?2)")?;
        for case in &corpus.cases {
            for tag in &case.tags {
                if let Some(tag_id) = tag_ids.get(tag.as_str()) {
                    insert_case_tag.execute(params![case.id.as_str(), tag_id])?;
                    summary.case_tags += 1;
                }
            }
        }

        let mut insert_suite = tx.prepare(
            "INSERT INTO test_suites
                (id, name, path, kind, filter_text, execution_mode, max_concurrent, delay_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for suite in &corpus.suites {
            let (filter_text, settings) = match &suite.body {
                SuiteBody::Static { .. } => (None, None),
                SuiteBody::Dynamic { filter_text, .. } => (Some(filter_text.as_str()), None),
                SuiteBody::Collection { settings, .. } => (None, Some(settings)),
            };
            insert_suite.execute(params![
                suite.id.as_str(),
                suite.name,
                suite.path,
                suite.kind().as_str(),
                filter_text,
                settings.map(|s| s.execution_mode.as_str()),
                settings.map(|s| s.max_concurrent),
                settings.map(|s| s.delay_seconds),
            ])?;
            summary.suites += 1;
        }

        let mut insert_link = tx.prepare(
            "INSERT INTO test_suite_case_links (test_suite_id, test_case_id, origin)
             VALUES (?1, ?2, ?3)",
        )?;
        for link in &links.links {
            insert_link.execute(params![
                link.suite_id.as_str(),
                link.case_id.as_str(),
                link.origin.as_str(),
            ])?;
            summary.case_links += 1;
        }

        let mut insert_fanout = tx.prepare(
            "INSERT INTO test_suite_collection_links
                (collection_id, suite_path, test_suite_id, group_name, profile_name, browser,
                 run_enabled, case_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for entry in &links.fanout {
            insert_fanout.execute(params![
                entry.collection_id.as_str(),
                entry.suite_path,
                entry.suite_id.as_ref().map(|id| id.as_str()),
                entry.group,
                entry.profile,
                entry.browser,
                entry.enabled,
                entry.case_count,
            ])?;
            summary.collection_links += 1;
        }
    }
    tx.commit()?;

    info!(
        test_cases = summary.test_cases,
        tags = summary.tags,
        suites = summary.suites,
        case_links = summary.case_links,
        collection_links = summary.collection_links,
        "run persisted"
    );
    Ok(summary)
}

/// Cases with at least one suite link.
pub fn covered_case_count(conn: &rusqlite::Connection) -> Result<usize> {
    let count = conn.query_row(
        "SELECT COUNT(DISTINCT test_case_id) FROM test_suite_case_links",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Execution instances: links of suites no enabled collection entry runs,
/// plus the case count of every enabled, resolved collection entry.
pub fn execution_count(conn: &rusqlite::Connection) -> Result<usize> {
    let count = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM test_suite_case_links
              WHERE test_suite_id NOT IN (
                SELECT test_suite_id FROM test_suite_collection_links
                 WHERE run_enabled = 1 AND test_suite_id IS NOT NULL))
          + (SELECT COALESCE(SUM(case_count), 0) FROM test_suite_collection_links
              WHERE run_enabled = 1 AND test_suite_id IS NOT NULL)",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
