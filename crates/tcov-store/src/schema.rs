//! Relational shape of one persisted analysis run.

use crate::Result;

/// Tables created by [`create_schema`], parents before children.
pub const TABLES: [&str; 6] = [
    "test_cases",
    "tags",
    "test_case_tags",
    "test_suites",
    "test_suite_case_links",
    "test_suite_collection_links",
];

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS test_cases (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    folder_path   TEXT NOT NULL,
    parameterized INTEGER NOT NULL DEFAULT 0,
    has_variables INTEGER NOT NULL DEFAULT 0,
    updated_at    TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    usage_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS test_case_tags (
    test_case_id TEXT NOT NULL REFERENCES test_cases(id),
    tag_id       INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (test_case_id, tag_id)
);

CREATE TABLE IF NOT EXISTS test_suites (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    path           TEXT NOT NULL,
    kind           TEXT NOT NULL CHECK (kind IN ('static', 'dynamic', 'collection')),
    filter_text    TEXT,
    execution_mode TEXT,
    max_concurrent INTEGER,
    delay_seconds  INTEGER
);

CREATE TABLE IF NOT EXISTS test_suite_case_links (
    id            INTEGER PRIMARY KEY,
    test_suite_id TEXT NOT NULL REFERENCES test_suites(id),
    test_case_id  TEXT NOT NULL REFERENCES test_cases(id),
    origin        TEXT NOT NULL CHECK (origin IN ('explicit', 'filter'))
);

CREATE TABLE IF NOT EXISTS test_suite_collection_links (
    id            INTEGER PRIMARY KEY,
    collection_id TEXT NOT NULL REFERENCES test_suites(id),
    suite_path    TEXT NOT NULL,
    test_suite_id TEXT REFERENCES test_suites(id),
    group_name    TEXT NOT NULL DEFAULT '',
    profile_name  TEXT NOT NULL DEFAULT '',
    browser       TEXT NOT NULL DEFAULT '',
    run_enabled   INTEGER NOT NULL DEFAULT 1,
    case_count    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_case_links_case ON test_suite_case_links(test_case_id);
CREATE INDEX IF NOT EXISTS idx_case_links_suite ON test_suite_case_links(test_suite_id);
CREATE INDEX IF NOT EXISTS idx_collection_links_suite ON test_suite_collection_links(test_suite_id);
";

/// Create every table and index if missing. Safe to call on an existing store.
pub fn create_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Open (or create) a store file with the schema in place.
pub fn open(path: &std::path::Path) -> Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_exactly_the_contract_tables() {
        let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        create_schema(&conn).expect("create schema");
        create_schema(&conn).expect("create schema twice");

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("prepare");
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<std::result::Result<_, _>>()
            .expect("collect");

        let mut expected: Vec<String> = TABLES.iter().map(|t| (*t).to_owned()).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn origin_is_constrained() {
        let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        create_schema(&conn).expect("create schema");
        let result = conn.execute(
            "INSERT INTO test_suite_case_links (test_suite_id, test_case_id, origin)
             VALUES ('s', 'c', 'implicit')",
            [],
        );
        assert!(result.is_err(), "unknown origin must be rejected");
    }
}
