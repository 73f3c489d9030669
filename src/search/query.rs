//! Transaction query parser.
//!
//! Parses user-typed query strings into a [`TransactionQuery`] usable as a
//! search predicate.
//!
//! # Supported syntax
//!
//! **Simple search**: `text` searches the note and the sender name.
//!
//! **Field-specific**:
//! - `id:3345678901` (exact, case-insensitive)
//! - `phone:0909123456`
//! - `name:"nguyen van a"`
//! - `note:order42`
//!
//! **Amount filters**: `amount:50000`, `amount:>50000`, `amount:>=50000`,
//! `amount:<50000`, `amount:<=50000` (periods are ignored: `amount:50.000`)
//!
//! **Date filters** (transaction day, UTC+7):
//! - `date:2026-10-17` / `date:2026-10` / `date:2026`
//! - `date:2026-10-01..2026-10-17`
//! - `before:2026-10-17` / `after:2026-10-01`
//!
//! **Operators**: terms are ANDed, `-term` negates, `"exact phrase"` quotes.
//! A quoted value must equal the whole field, except for notes, where it
//! may appear anywhere.

use chrono::{Datelike, NaiveDate};

use crate::model::transaction::TransactionRecord;

/// Which field a text term looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryField {
    /// Note and sender name (default).
    All,
    Id,
    Phone,
    Name,
    Note,
}

/// How to match text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOperator {
    /// Case-insensitive substring match.
    Contains(String),
    /// Exact quoted phrase (still case-insensitive).
    Exact(String),
}

/// Amount comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountFilter {
    Exact(i64),
    GreaterThan(i64),
    AtLeast(i64),
    LessThan(i64),
    AtMost(i64),
}

/// Transaction day filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    /// Single day.
    Exact(NaiveDate),
    /// Inclusive range.
    Range(NaiveDate, NaiveDate),
    /// Before a date (exclusive).
    Before(NaiveDate),
    /// After a date (exclusive).
    After(NaiveDate),
    /// All days in a month.
    Month(i32, u32),
    /// All days in a year.
    Year(i32),
}

/// A single text term.
#[derive(Debug, Clone)]
pub struct QueryTerm {
    pub field: QueryField,
    pub operator: TextOperator,
    pub negated: bool,
}

/// A fully parsed query. An empty query matches every transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Text terms, all of which must match.
    pub terms: Vec<QueryTerm>,
    /// Amount bounds, all of which must hold.
    pub amount_filters: Vec<AmountFilter>,
    /// Optional date filter.
    pub date_filter: Option<DateFilter>,
}

/// Parse a query string into a structured [`TransactionQuery`].
///
/// Never fails: unrecognized syntax is treated as a plain text search.
pub fn parse_query(input: &str) -> TransactionQuery {
    let mut query = TransactionQuery::default();

    for token in tokenize(input.trim()) {
        let (negated, token) = match token.strip_prefix('-') {
            Some(stripped) if !stripped.is_empty() => (true, stripped),
            _ => (false, token.as_str()),
        };

        let field_term = |field: QueryField, value: &str| QueryTerm {
            field,
            operator: make_operator(value),
            negated,
        };

        if let Some(value) = token.strip_prefix("id:") {
            // Ids never match partially.
            let unquoted = value.trim_matches('"').to_lowercase();
            query.terms.push(QueryTerm {
                field: QueryField::Id,
                operator: TextOperator::Exact(unquoted),
                negated,
            });
        } else if let Some(value) = token.strip_prefix("phone:") {
            query.terms.push(field_term(QueryField::Phone, value));
        } else if let Some(value) = token.strip_prefix("name:") {
            query.terms.push(field_term(QueryField::Name, value));
        } else if let Some(value) = token.strip_prefix("note:") {
            query.terms.push(field_term(QueryField::Note, value));
        } else if let Some(value) = token.strip_prefix("amount:") {
            if let Some(filter) = parse_amount_filter(value) {
                query.amount_filters.push(filter);
            }
        } else if let Some(value) = token.strip_prefix("date:") {
            if let Some(filter) = parse_date_filter(value) {
                query.date_filter = Some(filter);
            }
        } else if let Some(value) = token.strip_prefix("before:") {
            if let Some(d) = parse_naive_date(value) {
                query.date_filter = Some(DateFilter::Before(d));
            }
        } else if let Some(value) = token.strip_prefix("after:") {
            if let Some(d) = parse_naive_date(value) {
                query.date_filter = Some(DateFilter::After(d));
            }
        } else {
            query.terms.push(field_term(QueryField::All, token));
        }
    }

    query
}

impl TransactionQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.amount_filters.is_empty() && self.date_filter.is_none()
    }

    /// Whether `record` satisfies every part of the query.
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(ref df) = self.date_filter {
            if !matches_date(record, df) {
                return false;
            }
        }

        if !self
            .amount_filters
            .iter()
            .all(|filter| matches_amount(record.amount, filter))
        {
            return false;
        }

        self.terms.iter().all(|term| term_matches(record, term))
    }
}

fn term_matches(record: &TransactionRecord, term: &QueryTerm) -> bool {
    let name = record.name.as_deref().unwrap_or("");
    let note = record.content.as_deref().unwrap_or("");

    let raw_match = match term.field {
        QueryField::All => matches_phrase(note, &term.operator) || matches_text(name, &term.operator),
        QueryField::Id => matches_text(&record.id, &term.operator),
        QueryField::Phone => matches_text(&record.phone_number, &term.operator),
        QueryField::Name => matches_text(name, &term.operator),
        QueryField::Note => matches_phrase(note, &term.operator),
    };

    raw_match != term.negated
}

/// Case-insensitive text matching.
fn matches_text(haystack: &str, op: &TextOperator) -> bool {
    let haystack_lower = haystack.to_lowercase();
    match op {
        TextOperator::Contains(needle) => haystack_lower.contains(needle.as_str()),
        TextOperator::Exact(phrase) => haystack_lower == *phrase,
    }
}

/// Notes are free text: a quoted phrase matches anywhere inside them.
fn matches_phrase(haystack: &str, op: &TextOperator) -> bool {
    let haystack_lower = haystack.to_lowercase();
    match op {
        TextOperator::Contains(needle) | TextOperator::Exact(needle) => {
            haystack_lower.contains(needle.as_str())
        }
    }
}

fn matches_amount(amount: i64, filter: &AmountFilter) -> bool {
    match *filter {
        AmountFilter::Exact(v) => amount == v,
        AmountFilter::GreaterThan(v) => amount > v,
        AmountFilter::AtLeast(v) => amount >= v,
        AmountFilter::LessThan(v) => amount < v,
        AmountFilter::AtMost(v) => amount <= v,
    }
}

/// Compare against the transaction's local (UTC+7) day.
fn matches_date(record: &TransactionRecord, filter: &DateFilter) -> bool {
    let date = record.date.date_naive();
    match filter {
        DateFilter::Exact(d) => date == *d,
        DateFilter::Range(start, end) => date >= *start && date <= *end,
        DateFilter::Before(d) => date < *d,
        DateFilter::After(d) => date > *d,
        DateFilter::Month(year, month) => date.year() == *year && date.month() == *month,
        DateFilter::Year(year) => date.year() == *year,
    }
}

/// Build an operator from a value string (quoted → Exact, otherwise → Contains).
fn make_operator(value: &str) -> TextOperator {
    match value.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(unquoted) => TextOperator::Exact(unquoted.to_lowercase()),
        None => TextOperator::Contains(value.to_lowercase()),
    }
}

/// Tokenize input respecting quoted strings.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse `50000`, `>50000`, `>=50.000`, `<50000`, `<=50000`.
fn parse_amount_filter(value: &str) -> Option<AmountFilter> {
    let (ctor, rest): (fn(i64) -> AmountFilter, &str) = if let Some(r) = value.strip_prefix(">=") {
        (AmountFilter::AtLeast, r)
    } else if let Some(r) = value.strip_prefix("<=") {
        (AmountFilter::AtMost, r)
    } else if let Some(r) = value.strip_prefix('>') {
        (AmountFilter::GreaterThan, r)
    } else if let Some(r) = value.strip_prefix('<') {
        (AmountFilter::LessThan, r)
    } else {
        (AmountFilter::Exact, value)
    };

    rest.replace('.', "").parse().ok().map(ctor)
}

/// Parse a date filter value like `2026-10-17`, `2026-10`, `2026`,
/// or a range `2026-10-01..2026-10-17` (partial dates accepted in ranges).
fn parse_date_filter(value: &str) -> Option<DateFilter> {
    if let Some((start, end)) = value.split_once("..") {
        let s = parse_flexible_date_start(start)?;
        let e = parse_flexible_date_end(end)?;
        return Some(DateFilter::Range(s, e));
    }

    if let Some(d) = parse_naive_date(value) {
        return Some(DateFilter::Exact(d));
    }

    let parts: Vec<&str> = value.split('-').collect();
    match parts.as_slice() {
        [year, month] => {
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            (1..=12)
                .contains(&month)
                .then_some(DateFilter::Month(year, month))
        }
        [year] => {
            let year: i32 = year.parse().ok()?;
            (1970..=2100).contains(&year).then_some(DateFilter::Year(year))
        }
        _ => None,
    }
}

/// Parse a date string like `2026-10-17`.
fn parse_naive_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// First day of a `YYYY-MM-DD`, `YYYY-MM` or `YYYY` period.
fn parse_flexible_date_start(s: &str) -> Option<NaiveDate> {
    if let Some(d) = parse_naive_date(s) {
        return Some(d);
    }
    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
        [year, month] => NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1),
        [year] => NaiveDate::from_ymd_opt(year.parse().ok()?, 1, 1),
        _ => None,
    }
}

/// Last day of a `YYYY-MM-DD`, `YYYY-MM` or `YYYY` period.
fn parse_flexible_date_end(s: &str) -> Option<NaiveDate> {
    if let Some(d) = parse_naive_date(s) {
        return Some(d);
    }
    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
        [year, month] => {
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            // Last day of month: first of next month, minus one day
            let (ny, nm) = if month == 12 {
                (year.checked_add(1)?, 1)
            } else {
                (year, month + 1)
            };
            NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
        }
        [year] => NaiveDate::from_ymd_opt(year.parse().ok()?, 12, 31),
        _ => None,
    }
}
