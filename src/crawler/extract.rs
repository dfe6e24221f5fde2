//! Page extraction
//!
//! Turns fetched HTML into the structured fields the crawl engine needs.
//! The engine only depends on the [`Extract`] trait; `HtmlExtractor` is the
//! built-in implementation for static documentation sites. Extraction
//! failures never crash a worker: the item is logged and dropped.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Hard cap on the persisted content excerpt, in characters
const CONTENT_CAP: usize = 1200;

/// Minimum length for a meta description to be preferred over body text
const MIN_DESCRIPTION_LEN: usize = 40;

/// Title extraction strategies, tried in order
const TITLE_SELECTORS: &[&str] = &["main h1", "article h1", "h1", "head > title", "title"];

/// Breadcrumb trail containers seen across documentation generators
const BREADCRUMB_SELECTORS: &[&str] = &[
    "nav.breadcrumb li",
    "nav[aria-label='Breadcrumb'] li",
    "nav[aria-label='breadcrumb'] li",
    ".breadcrumb li",
    "ul.breadcrumbs li",
];

/// Navigation containers whose anchors drive the crawl
const NAV_SELECTORS: &[&str] = &[
    "nav a[href]",
    "[role='navigation'] a[href]",
    ".toc a[href]",
    ".sidebar a[href]",
];

/// Related-topic cross references, recorded but not treated as navigation
const RELATED_SELECTORS: &[&str] = &[".related a[href]", ".relinfo a[href]", ".related-links a[href]"];

/// Structured data extracted from one fetched page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Page title after the full fallback chain; never empty
    pub title: String,

    /// Breadcrumb trail labels, "Home" excluded
    pub breadcrumbs: Vec<String>,

    /// Bounded body excerpt
    pub content: String,

    /// Absolute candidate URLs for the frontier
    pub outgoing_links: Vec<String>,

    /// Absolute related-topic URLs, kept on the record as provenance
    pub related_urls: Vec<String>,
}

/// The extraction step the crawl engine delegates to
///
/// Implementations must not panic on malformed markup; return an `Err` and
/// let the worker drop the item.
pub trait Extract: Send + Sync {
    fn extract(&self, html: &str, page_url: &Url) -> crate::Result<ExtractedPage>;
}

/// Built-in extractor for server-rendered documentation sites
#[derive(Debug, Default)]
pub struct HtmlExtractor;

impl Extract for HtmlExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> crate::Result<ExtractedPage> {
        let document = Html::parse_document(html);

        let breadcrumbs = extract_breadcrumbs(&document);
        let title = extract_title(&document)
            .unwrap_or_else(|| fallback_title(&breadcrumbs, page_url));
        let content = extract_content(&document, &title);

        let nav_links = select_links(&document, NAV_SELECTORS, page_url);
        let related_urls = select_links(&document, RELATED_SELECTORS, page_url);

        // Navigation anchors bound the crawl tree. Pages without any nav
        // container (plain generated index pages) fall back to every
        // anchor, the way the original site map was discovered.
        let outgoing_links = if nav_links.is_empty() {
            select_links(&document, &["a[href]"], page_url)
        } else {
            let mut links = nav_links;
            for url in &related_urls {
                if !links.contains(url) {
                    links.push(url.clone());
                }
            }
            links
        };

        Ok(ExtractedPage {
            title,
            breadcrumbs,
            content,
            outgoing_links,
            related_urls,
        })
    }
}

/// First non-empty result from the ordered title strategies
fn extract_title(document: &Html) -> Option<String> {
    for selector_str in TITLE_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(text) = document
            .select(&selector)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
        {
            return Some(text);
        }
    }
    None
}

/// Title fallback chain for pages where every strategy came up empty:
/// last breadcrumb label, then a humanized URL path segment, then the
/// literal "Untitled Page". Persisted titles are never empty.
fn fallback_title(breadcrumbs: &[String], page_url: &Url) -> String {
    if let Some(crumb) = breadcrumbs.iter().rev().find(|c| !c.trim().is_empty()) {
        return crumb.trim().to_string();
    }

    if let Some(segment) = last_meaningful_segment(page_url) {
        let humanized = humanize_segment(&segment);
        if !humanized.is_empty() {
            return humanized;
        }
    }

    "Untitled Page".to_string()
}

/// Last path segment that isn't empty or a bare index file
fn last_meaningful_segment(url: &Url) -> Option<String> {
    url.path()
        .split('/')
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("index.html"))
        .next_back()
        .map(|s| s.to_string())
}

/// Turns a URL path segment into a display title: strip the .html suffix,
/// replace hyphens/underscores with spaces, uppercase the first letter.
fn humanize_segment(segment: &str) -> String {
    let base = segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment);
    let spaced = base.replace(['-', '_'], " ").trim().to_string();

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Breadcrumb labels in trail order, excluding any literal "Home"
fn extract_breadcrumbs(document: &Html) -> Vec<String> {
    for selector_str in BREADCRUMB_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let crumbs: Vec<String> = document
            .select(&selector)
            .map(element_text)
            .filter(|label| !label.is_empty() && !label.eq_ignore_ascii_case("home"))
            .collect();
        if !crumbs.is_empty() {
            return crumbs;
        }
    }
    Vec::new()
}

/// Bounded content excerpt: a long-enough meta description wins, otherwise
/// visible body text. A leading copy of the title is stripped so the
/// excerpt doesn't repeat it in downstream display.
fn extract_content(document: &Html, title: &str) -> String {
    let description = Selector::parse("meta[name='description']")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|s| collapse_whitespace(s))
        })
        .filter(|s| s.chars().count() >= MIN_DESCRIPTION_LEN);

    let mut text = match description {
        Some(d) => d,
        None => Selector::parse("body")
            .ok()
            .and_then(|selector| document.select(&selector).next())
            .map(element_text)
            .unwrap_or_default(),
    };

    if !title.is_empty() {
        if let Some(stripped) = text.strip_prefix(title) {
            text = stripped.trim_start().to_string();
        }
    }

    truncate_chars(&text, CONTENT_CAP)
}

/// Collects anchors matched by any of the selectors, resolved against the
/// page URL, de-duplicated while preserving document order.
fn select_links(document: &Html, selectors: &[&str], page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(absolute) = resolve_link(href, page_url) {
                if seen.insert(absolute.clone()) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves a href to an absolute http(s) URL, excluding non-navigational
/// schemes and same-page anchors
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// All text under an element, whitespace-collapsed. Text nodes are joined
/// with a space so adjacent block elements don't run together.
fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `cap` characters on a char boundary
fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://docs.example.com/guides/getting-started.html").unwrap()
    }

    fn extract(html: &str) -> ExtractedPage {
        HtmlExtractor.extract(html, &page_url()).unwrap()
    }

    #[test]
    fn test_title_from_h1() {
        let page = extract(
            r#"<html><head><title>Doc Title</title></head>
            <body><main><h1>Main Heading</h1></main></body></html>"#,
        );
        assert_eq!(page.title, "Main Heading");
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let page = extract(r#"<html><head><title>Doc Title</title></head><body></body></html>"#);
        assert_eq!(page.title, "Doc Title");
    }

    #[test]
    fn test_title_falls_back_to_last_breadcrumb() {
        let page = extract(
            r#"<html><body>
            <nav class="breadcrumb"><ul>
                <li>Home</li><li>Guides</li><li>Getting Started</li>
            </ul></nav>
            </body></html>"#,
        );
        assert_eq!(page.title, "Getting Started");
        assert_eq!(page.breadcrumbs, vec!["Guides", "Getting Started"]);
    }

    #[test]
    fn test_title_falls_back_to_url_segment() {
        let page = extract("<html><body></body></html>");
        // "getting-started.html" -> "Getting started"
        assert_eq!(page.title, "Getting started");
    }

    #[test]
    fn test_url_segment_skips_index_html() {
        let url = Url::parse("https://docs.example.com/web-security/index.html").unwrap();
        let page = HtmlExtractor
            .extract("<html><body></body></html>", &url)
            .unwrap();
        assert_eq!(page.title, "Web security");
    }

    #[test]
    fn test_untitled_page_literal() {
        let url = Url::parse("https://docs.example.com/").unwrap();
        let page = HtmlExtractor
            .extract("<html><body></body></html>", &url)
            .unwrap();
        assert_eq!(page.title, "Untitled Page");
    }

    #[test]
    fn test_breadcrumbs_exclude_home() {
        let page = extract(
            r#"<html><body>
            <ul class="breadcrumbs"><li>Home</li><li>Admin</li><li>Users</li></ul>
            </body></html>"#,
        );
        assert_eq!(page.breadcrumbs, vec!["Admin", "Users"]);
    }

    #[test]
    fn test_content_prefers_long_meta_description() {
        let page = extract(
            r#"<html><head>
            <meta name="description" content="A sufficiently long description of this documentation page for testing.">
            </head><body><h1>T</h1><p>Body text here.</p></body></html>"#,
        );
        assert!(page.content.starts_with("A sufficiently long description"));
    }

    #[test]
    fn test_content_ignores_short_meta_description() {
        let page = extract(
            r#"<html><head><meta name="description" content="Too short.">
            </head><body><p>The actual body text of the page.</p></body></html>"#,
        );
        assert_eq!(page.content, "The actual body text of the page.");
    }

    #[test]
    fn test_content_strips_title_prefix() {
        let page = extract(
            r#"<html><body><h1>Install Guide</h1><p>covers the setup steps.</p></body></html>"#,
        );
        assert_eq!(page.title, "Install Guide");
        assert!(
            page.content.starts_with("covers the setup steps"),
            "got {:?}",
            page.content
        );
    }

    #[test]
    fn test_content_capped() {
        let long_body = "word ".repeat(1000);
        let page = extract(&format!("<html><body><p>{long_body}</p></body></html>"));
        assert!(page.content.chars().count() <= CONTENT_CAP);
    }

    #[test]
    fn test_nav_links_preferred_over_body_links() {
        let page = extract(
            r#"<html><body>
            <nav><a href="/guides/a.html">A</a><a href="/guides/b.html">B</a></nav>
            <p><a href="/incidental.html">incidental</a></p>
            </body></html>"#,
        );
        assert_eq!(
            page.outgoing_links,
            vec![
                "https://docs.example.com/guides/a.html",
                "https://docs.example.com/guides/b.html"
            ]
        );
    }

    #[test]
    fn test_all_anchors_when_no_nav_container() {
        let page = extract(
            r#"<html><body>
            <a href="a.html">A</a>
            <a href="https://docs.example.com/b.html">B</a>
            </body></html>"#,
        );
        assert_eq!(
            page.outgoing_links,
            vec![
                "https://docs.example.com/guides/a.html",
                "https://docs.example.com/b.html"
            ]
        );
    }

    #[test]
    fn test_related_links_captured() {
        let page = extract(
            r#"<html><body>
            <nav><a href="/toc.html">TOC</a></nav>
            <div class="related"><a href="/see-also.html">See also</a></div>
            </body></html>"#,
        );
        assert_eq!(
            page.related_urls,
            vec!["https://docs.example.com/see-also.html"]
        );
        // related links also feed the frontier candidates
        assert!(page
            .outgoing_links
            .contains(&"https://docs.example.com/see-also.html".to_string()));
    }

    #[test]
    fn test_non_navigational_schemes_skipped() {
        let page = extract(
            r##"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:docs@example.com">mail</a>
            <a href="tel:+15551234">tel</a>
            <a href="#section">anchor</a>
            <a href="real.html">real</a>
            </body></html>"##,
        );
        assert_eq!(
            page.outgoing_links,
            vec!["https://docs.example.com/guides/real.html"]
        );
    }

    #[test]
    fn test_duplicate_links_collapsed() {
        let page = extract(
            r#"<html><body>
            <a href="a.html">one</a>
            <a href="a.html">two</a>
            </body></html>"#,
        );
        assert_eq!(page.outgoing_links.len(), 1);
    }

    #[test]
    fn test_humanize_segment() {
        assert_eq!(humanize_segment("getting-started.html"), "Getting started");
        assert_eq!(humanize_segment("admin_guide"), "Admin guide");
        assert_eq!(humanize_segment("overview.htm"), "Overview");
        assert_eq!(humanize_segment(""), "");
    }

    #[test]
    fn test_malformed_markup_still_extracts() {
        // html5ever error-corrects instead of failing; this must not panic
        let page = extract("<html><body><h1>Broken<div><a href='x.html'>link</body>");
        assert_eq!(page.title, "Broken link");
    }
}
