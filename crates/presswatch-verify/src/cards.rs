//! Card-item listing pages: index pages whose only mention of a client sits
//! inside article preview cards.

use std::collections::HashSet;

use presswatch_core::CardItemSite;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::content::ContentRules;
use crate::error::VerifyError;

const CARD_TITLE_SELECTOR: &str = "h2, h3, h4, .title";

/// A card whose text mentions the client, with the article it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLink {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardAnalysis {
    pub total_cards: usize,
    pub cards_with_match: Vec<CardLink>,
    /// The client name also appears in page text outside every card.
    pub match_outside_cards: bool,
}

impl CardAnalysis {
    /// True when the page only mentions the client through its cards.
    #[must_use]
    pub fn is_listing_page(&self) -> bool {
        !self.cards_with_match.is_empty() && !self.match_outside_cards
    }
}

/// Splits the page into cards and the rest, and looks for the client name in
/// each part.
///
/// Card links are resolved against `page_url`; cards without an `http(s)`
/// link are ignored.
///
/// # Errors
///
/// Returns [`VerifyError::InvalidSelector`] if a selector in `site` does not
/// parse.
pub fn analyze_card_items(
    document: &Html,
    page_url: &Url,
    client_name: &str,
    rules: &ContentRules,
    site: &CardItemSite,
) -> Result<CardAnalysis, VerifyError> {
    let card_selector = parse_selector(&site.card_selector)?;
    let link_selector = parse_selector(&site.link_selector)?;
    let title_selector = parse_selector(CARD_TITLE_SELECTOR)?;

    let cards: Vec<ElementRef<'_>> = document.select(&card_selector).collect();
    let card_ids: HashSet<_> = cards.iter().map(|card| card.id()).collect();

    let mut cards_with_match = Vec::new();
    for card in &cards {
        let card_text = element_text(*card);
        if !rules.contains_client_name(&card_text, client_name) {
            continue;
        }

        let Some(link) = card.select(&link_selector).next() else {
            continue;
        };
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(page_url, href))
        else {
            continue;
        };

        let mut title = element_text(link);
        if title.is_empty() {
            title = card
                .select(&title_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();
        }

        cards_with_match.push(CardLink { url, title });
    }

    let outside_text = visible_text(document, |element| card_ids.contains(&element.id()));
    let match_outside_cards = rules.contains_client_name(&outside_text, client_name);

    Ok(CardAnalysis {
        total_cards: cards.len(),
        cards_with_match,
        match_outside_cards,
    })
}

/// Body text without `script`, `style` and `noscript` contents, and without
/// anything under an element for which `skip` returns true.
pub(crate) fn visible_text<F>(document: &Html, skip: F) -> String
where
    F: Fn(ElementRef<'_>) -> bool,
{
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().filter_map(ElementRef::wrap).any(|element| {
            matches!(element.value().name(), "script" | "style" | "noscript") || skip(element)
        });
        if !hidden {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }
    parts.join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_link(page_url: &Url, href: &str) -> Option<String> {
    let url = page_url.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn parse_selector(selector: &str) -> Result<Selector, VerifyError> {
    Selector::parse(selector).map_err(|e| VerifyError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> CardItemSite {
        CardItemSite {
            domain: "thepacker.com".to_string(),
            card_selector: ".card".to_string(),
            link_selector: "a".to_string(),
        }
    }

    fn page_url() -> Url {
        Url::parse("https://www.thepacker.com/news/produce").unwrap()
    }

    fn rules() -> ContentRules {
        ContentRules::new(Vec::new(), 0)
    }

    #[test]
    fn name_only_in_cards_is_a_listing_page() {
        let html = Html::parse_document(
            r#"<html><body>
                <h1>Latest produce news</h1>
                <div class="card"><a href="/news/acme-expands">Acme expands to Texas</a></div>
                <div class="card"><h3>Acme hires CFO</h3><a href="https://www.thepacker.com/news/acme-cfo"></a></div>
                <div class="card"><a href="/news/other">Other grower news</a></div>
            </body></html>"#,
        );

        let analysis = analyze_card_items(&html, &page_url(), "Acme", &rules(), &site()).unwrap();

        assert_eq!(analysis.total_cards, 3);
        assert!(!analysis.match_outside_cards);
        assert!(analysis.is_listing_page());
        assert_eq!(
            analysis.cards_with_match,
            vec![
                CardLink {
                    url: "https://www.thepacker.com/news/acme-expands".to_string(),
                    title: "Acme expands to Texas".to_string(),
                },
                CardLink {
                    url: "https://www.thepacker.com/news/acme-cfo".to_string(),
                    title: "Acme hires CFO".to_string(),
                },
            ]
        );
    }

    #[test]
    fn name_outside_cards_is_not_a_listing_page() {
        let html = Html::parse_document(
            r#"<html><body>
                <article><p>Acme reported record sales this quarter.</p></article>
                <div class="card"><a href="/news/acme-expands">Acme expands</a></div>
            </body></html>"#,
        );

        let analysis = analyze_card_items(&html, &page_url(), "acme", &rules(), &site()).unwrap();

        assert!(analysis.match_outside_cards);
        assert_eq!(analysis.cards_with_match.len(), 1);
        assert!(!analysis.is_listing_page());
    }

    #[test]
    fn script_text_does_not_count_as_outside_match() {
        let html = Html::parse_document(
            r#"<html><body>
                <script>var featured = "Acme";</script>
                <div class="card"><a href="/news/acme">Acme story</a></div>
            </body></html>"#,
        );

        let analysis = analyze_card_items(&html, &page_url(), "Acme", &rules(), &site()).unwrap();
        assert!(analysis.is_listing_page());
    }

    #[test]
    fn cards_without_usable_links_are_skipped() {
        let html = Html::parse_document(
            r#"<html><body>
                <div class="card"><span>Acme without link</span></div>
                <div class="card"><a href="mailto:news@acme.com">Email Acme</a></div>
            </body></html>"#,
        );

        let analysis = analyze_card_items(&html, &page_url(), "Acme", &rules(), &site()).unwrap();
        assert!(analysis.cards_with_match.is_empty());
        assert!(!analysis.is_listing_page());
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let html = Html::parse_document("<html><body></body></html>");
        let bad = CardItemSite {
            card_selector: "div[".to_string(),
            ..site()
        };
        let err = analyze_card_items(&html, &page_url(), "Acme", &rules(), &bad).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSelector { .. }));
    }

    #[test]
    fn visible_text_skips_hidden_elements() {
        let html = Html::parse_document(
            "<html><head><title>T</title></head><body><p>Hello</p><noscript>Enable JS</noscript>\
             <style>p{}</style><p>world</p></body></html>",
        );
        assert_eq!(visible_text(&html, |_| false), "Hello world");
    }
}
