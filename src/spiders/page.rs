//! Generic HTML spider
//!
//! Extracts the title and outgoing links of every HTML page and follows those
//! links. Non-HTML responses produce no items.

use crate::crawler::{FetchResult, ParseError, Scheduler, Spider};
use crate::url::resolve_url;
use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

/// One crawled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Final URL of the page
    pub url: Url,

    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Distinct outgoing links, normalized, in document order
    pub links: Vec<Url>,
}

/// Title and raw link references found in an HTML document
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,

    /// `href` values worth following, unresolved
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title and link references
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - Fragment-only references (`#section`)
///
/// # Example
///
/// ```
/// use sumi_harvest::spiders::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title.as_deref(), Some("Test"));
/// assert_eq!(parsed.links, vec!["/page"]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href").filter(|h| is_followable(h)) {
                links.push(href.trim().to_string());
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href").filter(|h| is_followable(h)) {
                links.push(href.trim().to_string());
            }
        }
    }

    links
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();

    !(href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:"))
}

/// Spider that records every HTML page and follows its links
#[derive(Debug, Clone)]
pub struct PageSpider {
    follow_links: bool,
}

impl PageSpider {
    pub fn new() -> Self {
        Self { follow_links: true }
    }

    /// Controls whether discovered links are scheduled
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

impl Default for PageSpider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Spider for PageSpider {
    type Item = PageRecord;

    fn name(&self) -> &str {
        "page"
    }

    async fn parse(
        &self,
        response: &FetchResult,
        scheduler: &mut Scheduler,
    ) -> Result<Vec<PageRecord>, ParseError> {
        if !response.is_html() {
            tracing::trace!(
                "Skipping non-HTML response from {} ({:?})",
                response.final_url(),
                response.content_type()
            );
            return Ok(Vec::new());
        }

        let page = parse_html(&response.text());
        let mut links: Vec<Url> = Vec::new();

        for href in &page.links {
            if self.follow_links {
                if let Err(e) = scheduler.follow(href) {
                    tracing::debug!("Not following link on {}: {}", response.final_url(), e);
                    continue;
                }
            }

            if let Ok(url) = resolve_url(response.final_url(), href) {
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }

        Ok(vec![PageRecord {
            url: response.final_url().clone(),
            title: page.title,
            links,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::RequestSpec;

    fn html_response(url: &str, html: &str) -> FetchResult {
        let request = RequestSpec::new(url).unwrap();
        let final_url = request.url().clone();
        FetchResult::response(request, final_url, 200, html)
            .with_content_type("text/html; charset=utf-8")
    }

    #[test]
    fn test_extract_title() {
        let parsed = parse_html(r#"<html><head><title>  Test Page  </title></head></html>"#);
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse_html(r#"<html><head></head><body></body></html>"#);
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_skip_unfollowable_links() {
        let html = r##"
            <html><body>
                <a href="/valid">Valid</a>
                <a href="javascript:void(0)">JS</a>
                <a href="MAILTO:test@example.com">Email</a>
                <a href="tel:+1234567890">Call</a>
                <a href="data:text/html,<h1>x</h1>">Data</a>
                <a href="#section">Jump</a>
                <a href="/file.pdf" download>Download</a>
                <a href="other" rel="nofollow">Nofollow</a>
            </body></html>
        "##;
        let parsed = parse_html(html);
        assert_eq!(parsed.links, vec!["/valid", "other"]);
    }

    #[test]
    fn test_canonical_link_included() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head></html>"#;
        let parsed = parse_html(html);
        assert_eq!(parsed.links, vec!["https://example.com/canonical"]);
    }

    #[tokio::test]
    async fn test_page_spider_records_and_follows() {
        let response = html_response(
            "https://example.com/docs/index",
            r#"<html><head><title>Docs</title></head><body>
                <a href="intro">Intro</a>
                <a href="/docs/intro#top">Intro again</a>
                <a href="https://other.org/">Other</a>
            </body></html>"#,
        );
        let mut scheduler = Scheduler::new(&response);

        let items = PageSpider::new().parse(&response, &mut scheduler).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Docs"));
        let links: Vec<&str> = items[0].links.iter().map(Url::as_str).collect();
        assert_eq!(links, vec!["https://example.com/docs/intro", "https://other.org/"]);
        assert_eq!(scheduler.len(), 3);
    }

    #[tokio::test]
    async fn test_page_spider_without_following() {
        let response = html_response("https://example.com/", r#"<a href="/a">A</a>"#);
        let mut scheduler = Scheduler::new(&response);

        let items = PageSpider::new()
            .follow_links(false)
            .parse(&response, &mut scheduler)
            .await
            .unwrap();

        assert_eq!(items[0].links.len(), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_non_html_yields_nothing() {
        let request = RequestSpec::new("https://example.com/data.json").unwrap();
        let final_url = request.url().clone();
        let response = FetchResult::response(request, final_url, 200, r#"{"a": 1}"#)
            .with_content_type("application/json");
        let mut scheduler = Scheduler::new(&response);

        let items = PageSpider::new().parse(&response, &mut scheduler).await.unwrap();
        assert!(items.is_empty());
        assert!(scheduler.is_empty());
    }
}
