//! Content classification for fetched and rendered pages.

use std::sync::LazyLock;

use presswatch_core::NameVariant;
use regex::Regex;

/// Phrases that mark a bot challenge or access-denied page.
const BLOCK_INDICATORS: &[&str] = &[
    "access denied",
    "ray id",
    "cloudflare",
    "verify you are human",
    "checking your browser",
    "please wait while we verify",
    "just a moment",
    "enable javascript and cookies",
    "403 forbidden",
    "attention required",
];

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script block regex")
});

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style block regex")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Document,
    Other,
}

/// Name matching and length rules shared by the fetch and browser paths.
#[derive(Debug, Clone, Default)]
pub struct ContentRules {
    name_variants: Vec<NameVariant>,
    min_content_length: usize,
}

impl ContentRules {
    #[must_use]
    pub fn new(name_variants: Vec<NameVariant>, min_content_length: usize) -> Self {
        Self {
            name_variants,
            min_content_length,
        }
    }

    /// Case-insensitive search for the client name, then for each configured
    /// variant of it (`from` replaced by `to` in the lower-cased name).
    #[must_use]
    pub fn contains_client_name(&self, text: &str, client_name: &str) -> bool {
        let name = client_name.trim().to_lowercase();
        if text.is_empty() || name.is_empty() {
            return false;
        }

        let text = text.to_lowercase();
        if text.contains(&name) {
            return true;
        }

        self.name_variants
            .iter()
            .filter(|variant| name.contains(&variant.from))
            .map(|variant| name.replacen(&variant.from, &variant.to, 1))
            .any(|variant_name| !variant_name.is_empty() && text.contains(&variant_name))
    }

    #[must_use]
    pub fn is_suspiciously_short(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_content_length
    }
}

#[must_use]
pub fn is_blocked_page(text: &str) -> bool {
    let text = text.to_lowercase();
    BLOCK_INDICATORS
        .iter()
        .any(|indicator| text.contains(indicator))
}

#[must_use]
pub fn classify_content_type(header: &str) -> ContentKind {
    let header = header.to_lowercase();
    if header.contains("text/html") || header.contains("application/xhtml+xml") {
        ContentKind::Html
    } else if header.contains("application/pdf")
        || header.contains("application/msword")
        || header.contains("application/vnd.openxmlformats")
        || header.contains("application/vnd.ms-")
    {
        ContentKind::Document
    } else {
        ContentKind::Other
    }
}

/// Lower-cased text of an HTML document with scripts, styles and markup
/// removed.
#[must_use]
pub fn extract_text_from_html(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    WHITESPACE
        .replace_all(&text, " ")
        .trim()
        .to_lowercase()
}

fn decode_entities(text: &str) -> String {
    // `&amp;` last so "&amp;lt;" decodes to "&lt;" rather than "<".
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
