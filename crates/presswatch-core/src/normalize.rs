//! Pure normalization of raw hits into candidates, plus same-batch dedup.

use std::collections::HashSet;

use url::Url;

use crate::mention::{Candidate, ClientRef, RawHit, Sentiment};

const POSITIVE_KEYWORDS: &[&str] = &[
    "award",
    "wins",
    "winner",
    "honored",
    "celebrat",
    "success",
    "growth",
    "record high",
    "expands",
    "expansion",
    "launches",
    "partnership",
    "innovat",
    "praised",
    "recognized",
    "best ",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "recall",
    "lawsuit",
    "sued",
    "scandal",
    "fraud",
    "outbreak",
    "contaminat",
    "layoff",
    "bankrupt",
    "investigation",
    "decline",
    "losses",
    "shortage",
    "violation",
    "criticized",
];

/// Convert a raw provider hit into a [`Candidate`] for `client`.
///
/// Never fails: a malformed URL yields a candidate with no source domain.
#[must_use]
pub fn normalize_hit(hit: RawHit, client: &ClientRef) -> Candidate {
    let source_domain = extract_domain(&hit.url);
    let sentiment = tag_sentiment(&format!("{} {}", hit.title, hit.snippet));
    let normalized_url = normalize_url_for_comparison(&hit.url);
    let normalized_title = normalize_title(&hit.title);

    Candidate {
        title: hit.title,
        url: hit.url,
        snippet: hit.snippet,
        published_at: hit.published_at,
        client_id: client.id,
        client_name: client.name.clone(),
        provider: hit.provider,
        source_domain,
        sentiment,
        normalized_url,
        normalized_title,
    }
}

/// Lower-cased host of `url`, or `None` when it does not parse.
#[must_use]
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()?
        .host_str()
        .map(str::to_lowercase)
}

/// Canonical form of a URL used as a dedup key.
///
/// Lower-cases, forces `https`, drops a leading `www.`, the fragment and any
/// trailing `/`. Input that does not parse falls back to its trimmed,
/// lower-cased form.
#[must_use]
pub fn normalize_url_for_comparison(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let Ok(mut parsed) = Url::parse(&lowered) else {
        return lowered;
    };

    if parsed.scheme() == "http" {
        // http -> https is always permitted between special schemes.
        let _ = parsed.set_scheme("https");
    }

    let stripped_host = parsed
        .host_str()
        .and_then(|h| h.strip_prefix("www."))
        .map(str::to_string);
    if let Some(host) = stripped_host {
        let _ = parsed.set_host(Some(&host));
    }

    parsed.set_fragment(None);

    let mut out = parsed.to_string();
    while out.ends_with('/') {
        out.pop();
    }
    out
}

/// Trimmed, lower-cased, whitespace-collapsed title.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Naive keyword sentiment. Hits on both lists (or neither) are neutral.
#[must_use]
pub fn tag_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().any(|k| lower.contains(k));
    let negative = NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k));

    match (positive, negative) {
        (true, false) => Sentiment::Positive,
        (false, true) => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Drop candidates whose `(client, url)` or `(client, title)` key was already
/// seen earlier in `candidates`. Survivors keep their input order.
///
/// Blank titles never collide with each other.
#[must_use]
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen_urls: HashSet<(i64, String)> = HashSet::new();
    let mut seen_titles: HashSet<(i64, String)> = HashSet::new();

    candidates
        .into_iter()
        .filter(|c| {
            let url_key = (c.client_id, c.normalized_url.clone());
            let title_key = (c.client_id, c.normalized_title.clone());
            let has_title = !c.normalized_title.is_empty();

            if seen_urls.contains(&url_key) || (has_title && seen_titles.contains(&title_key)) {
                return false;
            }
            seen_urls.insert(url_key);
            if has_title {
                seen_titles.insert(title_key);
            }
            true
        })
        .collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
