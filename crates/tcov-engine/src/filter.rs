//! Dynamic suite filters: parsing of the source filter text into a
//! [`FilterPredicate`], and resolution of a predicate against the corpus.
//!
//! Filter text is a whitespace-separated list of clauses:
//!
//! ```text
//! name=(Checkout) tag=(smoke,api)
//! tag!=(flaky)
//! ```
//!
//! - `name=(s)`: case-insensitive substring of the case name. The value is
//!   not split on commas.
//! - `tag=(a,b)`: case carries at least one of the tags (case-sensitive).
//! - `tag!=(a,b)`: case carries none of the tags.
//!
//! Both clauses present means both must hold. An empty value is the same as
//! an absent clause, and a predicate with no clauses matches nothing. Clauses
//! with any other key are skipped; the known clauses still apply.

use std::collections::BTreeSet;

use tcov_types::{CaseId, FilterPredicate, TagCriterion, TestCase, WarningKind};
use thiserror::Error;

use crate::context::RunContext;

/// Why a filter text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail} at offset {offset}")]
pub struct FilterSyntaxError {
    pub offset: usize,
    pub detail: String,
}

impl FilterSyntaxError {
    fn new(offset: usize, detail: impl Into<String>) -> Self {
        Self {
            offset,
            detail: detail.into(),
        }
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_key(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Consume up to and including the next `)`, returning the enclosed text.
    fn take_value(&mut self) -> Result<&'a str, FilterSyntaxError> {
        let rest = self.rest();
        let Some(close) = rest.find(')') else {
            return Err(FilterSyntaxError::new(self.pos, "unbalanced parenthesis"));
        };
        let value = &rest[..close];
        if let Some(nested) = value.find('(') {
            return Err(FilterSyntaxError::new(
                self.pos + nested,
                "nested parenthesis in clause value",
            ));
        }
        self.pos += close + 1;
        Ok(value)
    }
}

/// A parsed filter plus the clause keys it did not recognize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFilter {
    pub predicate: FilterPredicate,
    pub ignored_keys: Vec<String>,
}

/// Parse a filter text into a predicate.
pub fn parse_filter(text: &str) -> Result<FilterPredicate, FilterSyntaxError> {
    parse_filter_text(text).map(|parsed| parsed.predicate)
}

/// Parse a filter text, keeping track of skipped clause keys.
pub fn parse_filter_text(text: &str) -> Result<ParsedFilter, FilterSyntaxError> {
    let mut predicate = FilterPredicate::default();
    let mut ignored_keys = Vec::new();
    let mut seen_name = false;
    let mut seen_tag = false;
    let mut cursor = Cursor::new(text);

    loop {
        cursor.skip_whitespace();
        if cursor.peek().is_none() {
            break;
        }

        let key_offset = cursor.pos;
        let key = cursor.take_key().to_ascii_lowercase();
        if key.is_empty() {
            return Err(FilterSyntaxError::new(key_offset, "expected clause key"));
        }
        let negated = cursor.eat('!');
        if !cursor.eat('=') {
            return Err(FilterSyntaxError::new(cursor.pos, "expected '='"));
        }
        if !cursor.eat('(') {
            return Err(FilterSyntaxError::new(cursor.pos, "expected '('"));
        }
        let value = cursor.take_value()?;

        match key.as_str() {
            "name" => {
                if negated {
                    return Err(FilterSyntaxError::new(
                        key_offset,
                        "name clause cannot be negated",
                    ));
                }
                if seen_name {
                    return Err(FilterSyntaxError::new(key_offset, "duplicate name clause"));
                }
                seen_name = true;
                let needle = value.trim();
                if !needle.is_empty() {
                    predicate.name = Some(needle.to_owned());
                }
            }
            "tag" => {
                if seen_tag {
                    return Err(FilterSyntaxError::new(key_offset, "duplicate tag clause"));
                }
                seen_tag = true;
                let tags: BTreeSet<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect();
                if !tags.is_empty() {
                    predicate.tags = Some(TagCriterion { tags, negated });
                }
            }
            other => ignored_keys.push(other.to_owned()),
        }
    }

    Ok(ParsedFilter {
        predicate,
        ignored_keys,
    })
}

/// Parse a suite's filter text, degrading to the empty predicate (with a
/// warning) when it is malformed.
pub fn parse_filter_or_empty(
    text: &str,
    suite_name: &str,
    ctx: &mut RunContext,
) -> FilterPredicate {
    match parse_filter_text(text) {
        Ok(ParsedFilter {
            predicate,
            ignored_keys,
        }) => {
            for key in ignored_keys {
                ctx.warn(
                    WarningKind::MalformedFilter,
                    suite_name,
                    format!("filter '{text}': ignored unknown clause key '{key}'"),
                );
            }
            if predicate.is_empty() {
                tracing::debug!(suite = suite_name, "dynamic suite has no usable criteria");
            }
            predicate
        }
        Err(error) => {
            ctx.warn(
                WarningKind::MalformedFilter,
                suite_name,
                format!("filter '{text}' rejected: {error}"),
            );
            FilterPredicate::default()
        }
    }
}

/// Whether a single case satisfies a non-empty predicate.
pub fn matches(predicate: &FilterPredicate, case: &TestCase) -> bool {
    if predicate.is_empty() {
        return false;
    }
    if let Some(criterion) = &predicate.tags {
        let intersects = !criterion.tags.is_disjoint(&case.tags);
        if intersects == criterion.negated {
            return false;
        }
    }
    if let Some(needle) = &predicate.name {
        if !case.name.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    true
}

/// Resolve a predicate against the corpus.
///
/// The result is a set; callers that need ordered output sort it themselves.
pub fn resolve(predicate: &FilterPredicate, cases: &[TestCase]) -> BTreeSet<CaseId> {
    if predicate.is_empty() {
        return BTreeSet::new();
    }
    cases
        .iter()
        .filter(|case| matches(predicate, case))
        .map(|case| case.id.clone())
        .collect()
}
