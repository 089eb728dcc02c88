//! Docs crawler tools — fetch pages and breadth-first crawl documentation.
//!
//! `fetch_page` grabs one URL and returns cleaned text plus the links found on
//! it. `crawl_docs` follows sublinks from seed URLs up to a depth and page cap
//! and returns all content as one Markdown document.

use std::collections::{HashSet, VecDeque};

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::debug;
use url::Url;

use super::Tool;

const USER_AGENT: &str = "ensemble/0.1 (docs-reader)";
const FETCH_TIMEOUT_SECS: u64 = 15;

/// File extensions that are never worth fetching as documentation.
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar", ".gz", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".mp4", ".mp3",
    ".exe", ".dmg",
];

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// True if `url` shares scheme and host (including port) with `base`.
fn same_origin(base: &Url, url: &Url) -> bool {
    base.scheme() == url.scheme()
        && base.host_str() == url.host_str()
        && base.port_or_known_default() == url.port_or_known_default()
}

fn skip_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Extract readable text from a parsed document, preferring `<main>` or
/// `<article>` content when present.
fn clean_text(doc: &Html) -> String {
    let scope = selector("main, article");
    let blocks = selector("h1, h2, h3, h4, p, li, pre");

    let elements: Vec<ElementRef> = match doc.select(&scope).next() {
        Some(root) => root.select(&blocks).collect(),
        None => doc.select(&blocks).collect(),
    };

    let mut lines = Vec::new();
    for el in elements {
        let text = el.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            continue;
        }
        match el.value().name() {
            "h1" | "h2" | "h3" | "h4" => lines.push(format!("\n## {text}\n")),
            "li" => lines.push(format!("  - {text}")),
            "pre" => lines.push(format!("\n```\n{text}\n```\n")),
            _ => lines.push(text),
        }
    }
    lines.join("\n").trim().to_string()
}

/// All absolute links on the page: fragments stripped, anchors/mailto/js
/// skipped, deduplicated in document order.
fn extract_links(doc: &Html, base: &Url) -> Vec<Url> {
    let anchors = selector("a[href]");
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&anchors) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(mut full) = base.join(href) else {
            continue;
        };
        full.set_fragment(None);
        if skip_url(&full) {
            continue;
        }
        if seen.insert(full.to_string()) {
            links.push(full);
        }
    }
    links
}

struct ParsedPage {
    title: String,
    content: String,
    links: Vec<Url>,
}

fn parse_page(html: &str, base: &Url) -> ParsedPage {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&selector("title"))
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| base.to_string());
    ParsedPage {
        title,
        content: clean_text(&doc),
        links: extract_links(&doc, base),
    }
}

struct CrawledPage {
    url: String,
    title: String,
    content: String,
    depth: usize,
}

/// Format crawled pages into one Markdown document for the agent to analyse.
fn summarize_crawl(pages: &[CrawledPage], skipped: usize) -> String {
    if pages.is_empty() {
        return "No pages were fetched.".to_string();
    }

    let sections = pages
        .iter()
        .map(|page| {
            let indent = "  ".repeat(page.depth);
            format!(
                "{indent}# [{}]({})  _(depth {})_\n\n{}",
                page.title, page.url, page.depth, page.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "{sections}\n\n---\n_Crawled {} pages. Skipped {} pages._",
        pages.len(),
        skipped
    )
}

// ---------------------------------------------------------------------------
// fetch_page
// ---------------------------------------------------------------------------

/// Fetch a single page and report its text content and links as JSON.
pub struct FetchPageTool {
    client: reqwest::Client,
}

impl FetchPageTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for FetchPageTool {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch(client: &reqwest::Client, url: &Url) -> Result<ParsedPage> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("error status from {url}"))?;
    let body = response
        .text()
        .await
        .with_context(|| format!("failed to read body of {url}"))?;
    // Parsing stays on this side of the await: scraper documents are not Send.
    Ok(parse_page(&body, url))
}

#[async_trait]
impl Tool for FetchPageTool {
    fn name(&self) -> &str {
        "fetch_page"
    }

    fn description(&self) -> &str {
        "Fetch a single web page and return its text content and all links found on it"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let raw = params
            .get("url")
            .and_then(Value::as_str)
            .context("missing 'url' parameter")?;
        let url = Url::parse(raw).with_context(|| format!("invalid URL: {raw}"))?;

        // Fetch failures are reported in-band so the model can react to them.
        let result = match fetch(&self.client, &url).await {
            Ok(page) => json!({
                "url": url.to_string(),
                "title": page.title,
                "content": page.content,
                "links": page.links.iter().map(Url::to_string).collect::<Vec<_>>(),
                "error": Value::Null,
            }),
            Err(e) => json!({
                "url": url.to_string(),
                "title": "",
                "content": "",
                "links": [],
                "error": format!("{e:#}"),
            }),
        };
        Ok(result.to_string())
    }
}

// ---------------------------------------------------------------------------
// crawl_docs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CrawlArgs {
    urls: Vec<String>,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
    #[serde(default = "default_max_pages")]
    max_pages: usize,
    #[serde(default = "default_stay_on_origin")]
    stay_on_origin: bool,
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

fn default_max_depth() -> usize {
    2
}

fn default_max_pages() -> usize {
    20
}

fn default_stay_on_origin() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    300
}

/// Breadth-first crawl from seed URLs, returning all content as Markdown.
pub struct CrawlDocsTool {
    client: reqwest::Client,
}

impl CrawlDocsTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    async fn crawl(&self, args: &CrawlArgs) -> Result<String> {
        let mut queue: VecDeque<(Url, usize, Url)> = VecDeque::new();
        for seed in &args.urls {
            let mut url = Url::parse(seed).with_context(|| format!("invalid seed URL: {seed}"))?;
            url.set_fragment(None);
            queue.push_back((url.clone(), 0, url));
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut pages: Vec<CrawledPage> = Vec::new();
        let mut skipped = 0usize;

        while let Some((url, depth, origin)) = queue.pop_front() {
            if pages.len() >= args.max_pages {
                skipped += 1;
                continue;
            }
            if !visited.insert(url.to_string()) {
                continue;
            }
            if skip_url(&url) {
                skipped += 1;
                continue;
            }

            debug!(url = %url, depth, "crawling page");
            let page = match fetch(&self.client, &url).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(url = %url, error = %format!("{e:#}"), "page skipped");
                    skipped += 1;
                    continue;
                }
            };

            if depth < args.max_depth {
                for link in &page.links {
                    if visited.contains(link.as_str()) {
                        continue;
                    }
                    if args.stay_on_origin && !same_origin(&origin, link) {
                        continue;
                    }
                    queue.push_back((link.clone(), depth + 1, origin.clone()));
                }
            }

            pages.push(CrawledPage {
                url: url.to_string(),
                title: page.title,
                content: page.content,
                depth,
            });

            if args.delay_ms > 0 {
                sleep(Duration::from_millis(args.delay_ms)).await;
            }
        }

        Ok(summarize_crawl(&pages, skipped))
    }
}

impl Default for CrawlDocsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CrawlDocsTool {
    fn name(&self) -> &str {
        "crawl_docs"
    }

    fn description(&self) -> &str {
        "Recursively crawl documentation starting from seed URLs and return all page content"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Seed URLs to start crawling from"
                },
                "max_depth": {
                    "type": "integer",
                    "description": "How many link-hops to follow from each seed (default 2)"
                },
                "max_pages": {
                    "type": "integer",
                    "description": "Maximum total pages to fetch (default 20)"
                },
                "stay_on_origin": {
                    "type": "boolean",
                    "description": "Only follow links on the same domain as each seed (default true)"
                },
                "delay_ms": {
                    "type": "integer",
                    "description": "Polite delay between requests in milliseconds (default 300)"
                }
            },
            "required": ["urls"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: CrawlArgs =
            serde_json::from_value(params).context("invalid crawl_docs arguments")?;
        self.crawl(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r##"
<html>
<head><title>Test Docs Page</title></head>
<body>
  <main>
    <h1>Getting Started</h1>
    <p>Welcome to the docs.</p>
    <h2>Installation</h2>
    <p>Run cargo add mylib to install.</p>
    <ul>
      <li>Feature A</li>
      <li>Feature B</li>
    </ul>
    <a href="/guide">User Guide</a>
    <a href="https://external.com/page">External Link</a>
    <a href="#section">Anchor (skip)</a>
    <a href="mailto:docs@example.com">Mail (skip)</a>
    <a href="/download.pdf">PDF (skip)</a>
  </main>
</body>
</html>
"##;

    fn base() -> Url {
        Url::parse("https://example.com/docs/").unwrap()
    }

    #[test]
    fn parse_page_extracts_title_and_content() {
        let page = parse_page(SAMPLE_HTML, &base());
        assert_eq!(page.title, "Test Docs Page");
        assert!(page.content.contains("## Getting Started"));
        assert!(page.content.contains("Welcome to the docs."));
        assert!(page.content.contains("  - Feature A"));
    }

    #[test]
    fn extract_links_resolves_and_filters() {
        let page = parse_page(SAMPLE_HTML, &base());
        let links: Vec<String> = page.links.iter().map(Url::to_string).collect();
        assert!(links.contains(&"https://example.com/guide".to_string()));
        assert!(links.contains(&"https://external.com/page".to_string()));
        assert!(!links.iter().any(|l| l.contains('#')));
        assert!(!links.iter().any(|l| l.starts_with("mailto:")));
        assert!(!links.iter().any(|l| l.ends_with(".pdf")));
    }

    #[test]
    fn same_origin_matches_scheme_and_host() {
        let a = Url::parse("https://example.com/docs").unwrap();
        assert!(same_origin(&a, &Url::parse("https://example.com/guide").unwrap()));
        assert!(!same_origin(&a, &Url::parse("http://example.com/guide").unwrap()));
        assert!(!same_origin(&a, &Url::parse("https://other.com/guide").unwrap()));
    }

    #[test]
    fn skip_url_filters_binary_extensions() {
        assert!(skip_url(&Url::parse("https://example.com/file.PDF").unwrap()));
        assert!(skip_url(&Url::parse("https://example.com/a/b.zip").unwrap()));
        assert!(!skip_url(&Url::parse("https://example.com/guide").unwrap()));
    }

    #[test]
    fn summarize_crawl_formats_pages_and_footer() {
        let pages = vec![
            CrawledPage {
                url: "https://example.com/".to_string(),
                title: "Root".to_string(),
                content: "root content".to_string(),
                depth: 0,
            },
            CrawledPage {
                url: "https://example.com/guide".to_string(),
                title: "Guide".to_string(),
                content: "guide content".to_string(),
                depth: 1,
            },
        ];
        let summary = summarize_crawl(&pages, 3);
        assert!(summary.contains("# [Root](https://example.com/)"));
        assert!(summary.contains("  # [Guide](https://example.com/guide)"));
        assert!(summary.contains("_Crawled 2 pages. Skipped 3 pages._"));
    }

    #[test]
    fn summarize_crawl_handles_empty_result() {
        assert_eq!(summarize_crawl(&[], 0), "No pages were fetched.");
    }
}
