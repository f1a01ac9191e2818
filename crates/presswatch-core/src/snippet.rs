//! Snippet cleanup and best-effort mention dates.
//!
//! Search and alert snippets usually open with "7 hours ago ..." or
//! "Jan 5, 2025 ..." before the actual excerpt.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

/// Separator between a prefix and the excerpt: ellipsis, dashes, dots, pipes.
const SEPARATOR: &str = r"\s*(?:\.{2,}|…|—|–|-|·|\|)?\s*";

static RELATIVE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*(\d+)\s+(second|sec|minute|min|hour|hr|day|week|wk|month|mo|year|yr)s?\s+ago{SEPARATOR}"
    ))
    .expect("valid relative prefix regex")
});

static MONTH_FIRST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*{MONTH}\s+\d{{1,2}},?\s+\d{{4}}{SEPARATOR}"))
        .expect("valid month-first prefix regex")
});

static DAY_FIRST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*\d{{1,2}}\s+{MONTH},?\s+\d{{4}}{SEPARATOR}"))
        .expect("valid day-first prefix regex")
});

static ISO_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*\d{{4}}-\d{{2}}-\d{{2}}{SEPARATOR}")).expect("valid iso prefix regex")
});

static MONTH_FIRST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\s+(\d{{1,2}}),?\s+(\d{{4}})\b"))
        .expect("valid month-first date regex")
});

static DAY_FIRST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(\d{{1,2}})\s+{MONTH},?\s+(\d{{4}})\b"))
        .expect("valid day-first date regex")
});

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid iso date regex")
});

/// Strip leading relative-time and date prefixes from a snippet.
///
/// Snippets without such a prefix come back unchanged.
#[must_use]
pub fn clean_snippet(snippet: &str) -> String {
    let mut current = snippet;
    let mut changed = false;

    // A snippet can carry both, e.g. "3 days ago — Jan 5, 2025 ...".
    loop {
        let matched = [
            &*RELATIVE_PREFIX,
            &*MONTH_FIRST_PREFIX,
            &*DAY_FIRST_PREFIX,
            &*ISO_PREFIX,
        ]
        .iter()
        .find_map(|re| re.find(current));

        match matched {
            Some(m) if m.end() > 0 => {
                current = &current[m.end()..];
                changed = true;
            }
            _ => break,
        }
    }

    if changed {
        current.trim().to_string()
    } else {
        snippet.to_string()
    }
}

/// Find a date in the snippet: a leading "N units ago" relative to `now`, or a
/// month-name (`Jan 5, 2025`, `5 January 2025`) or ISO (`2025-01-05`) date
/// anywhere in the text.
#[must_use]
pub fn extract_date_from_snippet(snippet: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = RELATIVE_PREFIX.captures(snippet) {
        let amount: i64 = caps[1].parse().ok()?;
        if amount > 100_000 {
            return None;
        }
        let unit = caps[2].to_lowercase();
        let offset = match unit.as_str() {
            "second" | "sec" => Duration::seconds(amount),
            "minute" | "min" => Duration::minutes(amount),
            "hour" | "hr" => Duration::hours(amount),
            "day" => Duration::days(amount),
            "week" | "wk" => Duration::weeks(amount),
            "month" | "mo" => Duration::days(amount.saturating_mul(30)),
            _ => Duration::days(amount.saturating_mul(365)),
        };
        return now.checked_sub_signed(offset);
    }

    if let Some(caps) = MONTH_FIRST_DATE.captures(snippet) {
        if let Some(date) = ymd(&caps[3], month_number(&caps[1]), &caps[2]) {
            return Some(date);
        }
    }

    if let Some(caps) = DAY_FIRST_DATE.captures(snippet) {
        if let Some(date) = ymd(&caps[3], month_number(&caps[2]), &caps[1]) {
            return Some(date);
        }
    }

    let caps = ISO_DATE.captures(snippet)?;
    let month = caps[2].parse::<u32>().ok()?;
    ymd(&caps[1], Some(month), &caps[3])
}

/// Mention date: a parseable `published_at`, else a date from the snippet,
/// else `now`.
#[must_use]
pub fn resolve_mention_date(
    published_at: Option<&str>,
    snippet: &str,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    published_at
        .and_then(parse_timestamp)
        .or_else(|| extract_date_from_snippet(snippet, now))
        .unwrap_or(now)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
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

fn ymd(year: &str, month: Option<u32>, day: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month?, day.parse().ok()?)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
