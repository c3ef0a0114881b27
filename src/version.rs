//! Version, stability and date heuristics over free-form release titles.
//!
//! These are shared by every parser variant. None of them fail: an input they
//! cannot make sense of yields `None` (or [`Stability::Stable`]) and the caller
//! decides whether to skip the block.

use crate::model::Stability;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static VERSION_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:version|ver|v)\.?\s*").unwrap());

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d[\d.]*").unwrap());

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{MONTHS}\.?,?\s+(\d{{4}})\b"
    ))
    .unwrap()
});

static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTHS}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .unwrap()
});

type StabilityRule = (Regex, fn(Option<u32>) -> Stability);

// Applied in order; a later match replaces the result of an earlier one.
// A marker may follow digits directly (`3.0rc1`) but not another letter.
static STABILITY_RULES: LazyLock<[StabilityRule; 3]> = LazyLock::new(|| {
    [
        (
            Regex::new(r"(?i)(?:^|[^[:alpha:]])alpha(?:[\s._-]*(\d+))?\b").unwrap(),
            Stability::Alpha,
        ),
        (
            Regex::new(r"(?i)(?:^|[^[:alpha:]])beta(?:[\s._-]*(\d+))?\b").unwrap(),
            Stability::Beta,
        ),
        (
            Regex::new(r"(?i)(?:^|[^[:alpha:]])(?:rc|release\s+candidate)(?:[\s._-]*(\d+))?\b")
                .unwrap(),
            Stability::Rc,
        ),
    ]
});

/// Extract a normalized version from a release title.
///
/// `prefix` is the vendor or plugin title, stripped case-insensitively when the
/// title starts with it. A leading `v`/`ver`/`version` token is dropped, then the
/// longest leading run of digits and dots is taken.
///
/// ```
/// use plugin_feed::version::extract_version;
///
/// assert_eq!(extract_version("Plugin 1.2 (stable)", Some("Plugin")).as_deref(), Some("1.2"));
/// assert_eq!(extract_version("Version 2.0.1 - bugfixes", None).as_deref(), Some("2.0.1"));
/// assert_eq!(extract_version("Unreleased", None), None);
/// ```
pub fn extract_version(text: &str, prefix: Option<&str>) -> Option<String> {
    let mut rest = text.trim();

    if let Some(prefix) = prefix.map(str::trim).filter(|p| !p.is_empty())
        && rest
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    {
        rest = &rest[prefix.len()..];
    }

    rest = strip_decoration(rest);
    if let Some(token) = VERSION_TOKEN_RE.find(rest) {
        rest = &rest[token.end()..];
    }

    let version = VERSION_RE.find(rest)?.as_str().trim_end_matches('.');
    if version.is_empty() {
        return None;
    }
    Some(version.to_string())
}

fn strip_decoration(text: &str) -> &str {
    text.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '=' | '#' | '*' | '[' | '(' | '-')
    })
}

/// Classify the release maturity mentioned in `text`.
///
/// Rules are tried in the order alpha, beta, release candidate and every rule
/// that matches overwrites the previous result, so `"beta, rc2"` is `rc.2`.
pub fn classify_stability(text: &str) -> Stability {
    let mut stability = Stability::Stable;

    for (pattern, make) in STABILITY_RULES.iter() {
        if let Some(caps) = pattern.captures(text) {
            let qualifier = caps.get(1).and_then(|m| m.as_str().parse().ok());
            stability = make(qualifier);
        }
    }

    stability
}

/// Find a calendar date in a release title (`2024-03-01`, `1 March 2024`,
/// `March 1st, 2024`). The result is midnight UTC of that day.
pub fn extract_date(text: &str) -> Option<DateTime<Utc>> {
    let date = if let Some(caps) = ISO_DATE_RE.captures(text) {
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    } else if let Some(caps) = DAY_MONTH_RE.captures(text) {
        NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            month_number(&caps[2])?,
            caps[1].parse().ok()?,
        )
    } else if let Some(caps) = MONTH_DAY_RE.captures(text) {
        NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            month_number(&caps[1])?,
            caps[2].parse().ok()?,
        )
    } else {
        None
    }?;

    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extract_version_plain() {
        assert_eq!(extract_version("1.2", None).as_deref(), Some("1.2"));
        assert_eq!(extract_version("  3.10.4 ", None).as_deref(), Some("3.10.4"));
        assert_eq!(extract_version("2.0 - 2024-01-05", None).as_deref(), Some("2.0"));
    }

    #[test]
    fn test_extract_version_strips_tokens() {
        assert_eq!(extract_version("v1.2", None).as_deref(), Some("1.2"));
        assert_eq!(extract_version("Ver. 1.2", None).as_deref(), Some("1.2"));
        assert_eq!(extract_version("VERSION 4.1 beta", None).as_deref(), Some("4.1"));
        assert_eq!(extract_version("= 1.2.3 =", None).as_deref(), Some("1.2.3"));
        assert_eq!(extract_version("[1.0.0] - 2023-12-01", None).as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_extract_version_strips_title_prefix() {
        assert_eq!(
            extract_version("Plugin 1.2 (stable)", Some("Plugin")).as_deref(),
            Some("1.2")
        );
        assert_eq!(
            extract_version("gravity forms v2.8.1 released", Some("Gravity Forms")).as_deref(),
            Some("2.8.1")
        );
        // Without the prefix the title does not start with a version
        assert_eq!(extract_version("Plugin 1.2", None), None);
    }

    #[test]
    fn test_extract_version_trims_trailing_dots() {
        assert_eq!(extract_version("1.2. Bug fixes", None).as_deref(), Some("1.2"));
    }

    #[test]
    fn test_extract_version_without_digits() {
        assert_eq!(extract_version("Unreleased", None), None);
        assert_eq!(extract_version("", None), None);
        assert_eq!(extract_version("version", None), None);
        assert_eq!(extract_version("vendor notes 1.2", None), None);
    }

    #[test]
    fn test_classify_stability() {
        assert_eq!(classify_stability("Version 2.0 beta 3"), Stability::Beta(Some(3)));
        assert_eq!(classify_stability("2.0 RC"), Stability::Rc(None));
        assert_eq!(classify_stability("2.0"), Stability::Stable);
        assert_eq!(classify_stability("1.0-alpha.2"), Stability::Alpha(Some(2)));
        assert_eq!(classify_stability("1.0 Release Candidate 1"), Stability::Rc(Some(1)));
        assert_eq!(classify_stability("3.0rc2"), Stability::Rc(Some(2)));
        assert_eq!(classify_stability("3.0RC2"), Stability::Rc(Some(2)));
        assert_eq!(classify_stability("2.0beta1"), Stability::Beta(Some(1)));
        assert_eq!(classify_stability("1.5alpha"), Stability::Alpha(None));
        assert_eq!(classify_stability("3.0-rc2"), Stability::Rc(Some(2)));
    }

    #[test]
    fn test_classify_stability_last_rule_wins() {
        assert_eq!(classify_stability("2.0 beta, rc2"), Stability::Rc(Some(2)));
        // rule order decides, not position in the text
        assert_eq!(classify_stability("rc1 then beta"), Stability::Rc(Some(1)));
        assert_eq!(classify_stability("beta 2 after alpha 5"), Stability::Beta(Some(2)));
    }

    #[test]
    fn test_classify_stability_ignores_embedded_words() {
        assert_eq!(classify_stability("alphabetical sorting"), Stability::Stable);
        assert_eq!(classify_stability("source maps"), Stability::Stable);
        assert_eq!(classify_stability("March release"), Stability::Stable);
    }

    #[test]
    fn test_extract_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(extract_date("1.2 (2024-03-01)"), Some(expected));
        assert_eq!(extract_date("v1.2 – 1 March 2024"), Some(expected));
        assert_eq!(extract_date("Released March 1st, 2024"), Some(expected));
        assert_eq!(extract_date("Mar 1 2024"), Some(expected));
    }

    #[test]
    fn test_extract_date_rejects_invalid() {
        assert_eq!(extract_date("1.2"), None);
        assert_eq!(extract_date("2024-13-40"), None);
    }
}
