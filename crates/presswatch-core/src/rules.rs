use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// URLs that never become mentions: social networks, aggregators, search
/// result pages and category/tag listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocklist {
    /// Hosts matched exactly or as a parent domain, ignoring a leading `www.`.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Case-insensitive substrings matched against the whole URL.
    #[serde(default)]
    pub url_patterns: Vec<String>,
}

impl Blocklist {
    /// Returns `true` when `url` (or its `domain`, if known) is blocklisted.
    #[must_use]
    pub fn is_blocked(&self, url: &str, domain: Option<&str>) -> bool {
        let url_lower = url.to_lowercase();
        if self
            .url_patterns
            .iter()
            .any(|p| url_lower.contains(&p.to_lowercase()))
        {
            return true;
        }

        let Some(domain) = domain else {
            return false;
        };
        let host = domain.trim_start_matches("www.").to_lowercase();
        self.domains.iter().any(|d| domain_matches(&host, d))
    }
}

/// A site whose index pages list articles as preview cards.
///
/// A client name found only inside the cards means the page itself is not
/// coverage; each matching card links to an article that might be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardItemSite {
    pub domain: String,
    pub card_selector: String,
    pub link_selector: String,
}

/// A `from -> to` substitution applied to the lower-cased client name when the
/// plain name is not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariant {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRules {
    #[serde(default)]
    pub blocklist: Blocklist,
    #[serde(default)]
    pub card_item_sites: Vec<CardItemSite>,
    #[serde(default)]
    pub name_variants: Vec<NameVariant>,
}

impl VerificationRules {
    /// Finds the card-item rule for `url`'s host, if any.
    #[must_use]
    pub fn card_item_site_for(&self, url: &str) -> Option<&CardItemSite> {
        let host = url::Url::parse(url)
            .ok()?
            .host_str()?
            .trim_start_matches("www.")
            .to_lowercase();
        self.card_item_sites
            .iter()
            .find(|site| domain_matches(&host, &site.domain))
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("www.").to_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Load and validate verification rules from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_rules(path: &Path) -> Result<VerificationRules, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_rules(&content)
}

/// Parse and validate verification rules from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_rules(content: &str) -> Result<VerificationRules, ConfigError> {
    let rules: VerificationRules = serde_yaml::from_str(content)?;
    validate_rules(&rules)?;
    Ok(rules)
}

fn validate_rules(rules: &VerificationRules) -> Result<(), ConfigError> {
    for domain in &rules.blocklist.domains {
        if domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "blocklist domain must be non-empty".to_string(),
            ));
        }
    }
    for pattern in &rules.blocklist.url_patterns {
        if pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "blocklist url pattern must be non-empty".to_string(),
            ));
        }
    }

    let mut seen_sites = HashSet::new();
    for site in &rules.card_item_sites {
        if site.domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "card item site domain must be non-empty".to_string(),
            ));
        }
        if site.card_selector.trim().is_empty() || site.link_selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "card item site '{}' needs both card_selector and link_selector",
                site.domain
            )));
        }
        if !seen_sites.insert(site.domain.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate card item site: '{}'",
                site.domain
            )));
        }
    }

    for variant in &rules.name_variants {
        if variant.from.trim().is_empty() {
            return Err(ConfigError::Validation(
                "name variant 'from' must be non-empty".to_string(),
            ));
        }
        if variant.from.to_lowercase() != variant.from || variant.to.to_lowercase() != variant.to {
            return Err(ConfigError::Validation(format!(
                "name variant '{} -> {}' must be lower-case",
                variant.from, variant.to
            )));
        }
    }

    Ok(())
}
