//! Tag browser scraping.
//!
//! The registry exposes a Trac-style directory listing of `tags/`. Every tag is a
//! directory row carrying the revision that created it, a relative age whose
//! tooltip holds the exact timestamp, and the commit message.

use crate::changelog::{collapse_whitespace, element_text};
use crate::model::{Tag, TagList};
use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

struct RowSelectors {
    row: Selector,
    dir: Selector,
    rev: Selector,
    age: Selector,
    message: Selector,
    change: Selector,
}

static SELECTORS: LazyLock<RowSelectors> = LazyLock::new(|| RowSelectors {
    row: Selector::parse("table#dirlist tr").unwrap(),
    dir: Selector::parse("td.name a.dir").unwrap(),
    rev: Selector::parse("td.rev a").unwrap(),
    age: Selector::parse("td.age [title]").unwrap(),
    message: Selector::parse("td.change span.change").unwrap(),
    change: Selector::parse("td.change").unwrap(),
});

const TIMESTAMP_PREFIXES: &[&str] = &["See timeline at", "Timeline at"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%y %H:%M:%S"];

/// Parse a tag listing into tags, in listing order.
///
/// Rows that are not directories are skipped, as are rows whose timestamp cannot
/// be read.
pub fn parse_tags(html: &str) -> TagList {
    let document = Html::parse_document(html);
    let mut tags = TagList::new();

    for row in document.select(&SELECTORS.row) {
        let Some(dir) = row.select(&SELECTORS.dir).next() else {
            continue;
        };

        match parse_row(row, dir) {
            Some(tag) => {
                if !tags.push(tag) {
                    tracing::debug!("Duplicate tag {} ignored", element_text(dir));
                }
            }
            None => tracing::debug!("Skipping unreadable tag row {}", element_text(dir)),
        }
    }

    tags
}

fn parse_row(row: ElementRef<'_>, dir: ElementRef<'_>) -> Option<Tag> {
    let name = normalize_tag_name(&element_text(dir))?;

    let revision = row
        .select(&SELECTORS.rev)
        .next()
        .map(element_text)
        .map(|rev| rev.trim_start_matches(['@', 'r']).to_string())
        .filter(|rev| !rev.is_empty())?;

    let created = row
        .select(&SELECTORS.age)
        .next()
        .and_then(|age| age.value().attr("title"))
        .and_then(parse_timestamp)?;

    let description = row
        .select(&SELECTORS.message)
        .next()
        .or_else(|| row.select(&SELECTORS.change).next())
        .map(element_text)
        .unwrap_or_default();

    Some(Tag {
        name,
        revision,
        description,
        created,
    })
}

/// Tag directory names may carry a leading `v` and a trailing slash
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let name = name.trim().trim_end_matches('/');
    let name = name
        .strip_prefix(['v', 'V'])
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(name);

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse the absolute timestamp from an age tooltip such as
/// `See timeline at 2024-03-01T10:00:00Z`.
pub fn parse_timestamp(title: &str) -> Option<DateTime<Utc>> {
    let mut text = collapse_whitespace(title);
    for prefix in TIMESTAMP_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim().to_string();
            break;
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .map(|naive| naive.and_utc())
}
