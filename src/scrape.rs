use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Datelike;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::transcript::TranscriptRecord;

pub const DEFAULT_SOURCE_URL: &str = "https://www.fool.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const RATE_LIMIT: Duration = Duration::from_secs(1);

/// Article containers, most specific first.
const ARTICLE_SELECTORS: &[&str] = &[
    "div[class*='article-body']",
    "div.tailwind-article-body",
    "article",
    "div.article-content",
    "main",
];

static PATH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").expect("path date pattern"));
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]+").expect("space run pattern"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern"));
static QUARTER_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Q([1-4])\s+(\d{4})").expect("quarter year pattern"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("year pattern"));

/// Fetches earnings-call transcript pages from the configured site.
pub struct TranscriptScraper {
    client: reqwest::Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl TranscriptScraper {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base = dotenv::var("TRANSCRIPT_SOURCE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string());
        Self::new(&base)
    }

    /// GET a page, waiting so requests are at least a second apart.
    async fn fetch(&self, url: &str) -> Result<String> {
        {
            let mut last = self.last_request.lock().await;
            if let Some(at) = *last {
                let elapsed = at.elapsed();
                if elapsed < RATE_LIMIT {
                    tokio::time::sleep(RATE_LIMIT - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from {}", url))?;
        resp.text().await.context("Failed to read response body")
    }

    /// Transcript URLs for a ticker, newest first, at most `limit`.
    pub async fn find_transcript_urls(&self, ticker: &str, exchange: &str, limit: usize) -> Result<Vec<String>> {
        let quote_url = format!(
            "{}/quote/{}/{}/",
            self.base_url,
            exchange.to_lowercase(),
            ticker.to_lowercase()
        );
        info!(ticker, url = %quote_url, "Searching for transcript URLs");

        let html = self.fetch(&quote_url).await?;
        let mut urls = transcript_links(&html, &self.base_url, ticker);
        urls.truncate(limit);

        info!(ticker, count = urls.len(), "Found transcript URLs");
        Ok(urls)
    }

    /// Scrape one transcript page. `Ok(None)` when no article body is found.
    pub async fn scrape(&self, url: &str) -> Result<Option<TranscriptRecord>> {
        info!(url, "Scraping transcript");
        let html = self.fetch(url).await?;

        let Some((title, full_text)) = extract_article(&html) else {
            warn!(url, "Could not find article content");
            return Ok(None);
        };
        let (quarter, year) = fiscal_period_from_title(&title);
        debug!(url, quarter, year, chars = full_text.len(), "Transcript scraped");

        Ok(Some(TranscriptRecord {
            quarter,
            year,
            title,
            url: url.to_string(),
            full_text,
            scraped_at: chrono::Utc::now().timestamp(),
        }))
    }
}

/// Transcript links on a quote page for `ticker`, absolutised, deduped,
/// newest first by the `/YYYY/MM/DD/` date in their path.
pub fn transcript_links(html: &str, base_url: &str, ticker: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let ticker = ticker.to_lowercase();

    let mut urls: Vec<String> = Vec::new();
    for a in document.select(&anchors) {
        let Some(href) = a.value().attr("href") else { continue };
        let lower = href.to_lowercase();
        if !lower.contains("earnings-call-transcript") {
            continue;
        }
        if !lower.split(|c: char| !c.is_alphanumeric()).any(|part| part == ticker) {
            continue;
        }
        let full = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
        };
        if !urls.contains(&full) {
            urls.push(full);
        }
    }

    // Stable: undated links keep page order after the dated ones.
    urls.sort_by_key(|u| std::cmp::Reverse(path_date(u)));
    urls
}

fn path_date(url: &str) -> Option<(i32, u32, u32)> {
    let caps = PATH_DATE.captures(url)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One paragraph per outermost block element, inline markup flattened into
/// its line, paragraphs separated by a blank line.
fn block_text(el: ElementRef<'_>, blocks: &Selector) -> String {
    let paragraphs: Vec<String> = el
        .select(blocks)
        .filter(|b| {
            // A block inside another block under `el` is already part of the outer one.
            !b.ancestors()
                .take_while(|a| a.id() != el.id())
                .filter_map(ElementRef::wrap)
                .any(|a| blocks.matches(&a))
        })
        .map(|b| SPACE_RUNS.replace_all(&b.text().collect::<String>(), " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        element_text(el)
    } else {
        paragraphs.join("\n\n")
    }
}

/// Page title and article text. Speaker lines such as
/// `<p><strong>Name</strong> -- <em>CEO</em></p>` come out as one line.
pub fn extract_article(html: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);
    let blocks = Selector::parse("p, h2, h3, h4, h5, li, blockquote").ok()?;

    let title = Selector::parse("h1")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|h1| SPACE_RUNS.replace_all(&h1.text().collect::<String>(), " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());

    let mut body = ARTICLE_SELECTORS.iter().find_map(|css| {
        let sel = Selector::parse(css).ok()?;
        document.select(&sel).next()
    });

    if body.is_none() {
        let divs = Selector::parse("div").ok()?;
        body = document.select(&divs).find(|div| {
            let text = element_text(*div);
            text.chars().count() > 5000 && text.to_lowercase().contains("earnings call")
        });
    }

    let text = block_text(body?, &blocks);
    let text = BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string();
    Some((title, text))
}

/// `Q<n> <yyyy>` in the title, else the first year with quarter 1, else the
/// current year with quarter 1.
pub fn fiscal_period_from_title(title: &str) -> (u8, i32) {
    if let Some(caps) = QUARTER_YEAR.captures(title) {
        if let (Ok(q), Ok(y)) = (caps[1].parse(), caps[2].parse()) {
            return (q, y);
        }
    }

    let year = YEAR
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or_else(|| chrono::Utc::now().year());
    (1, year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_period_from_title() {
        assert_eq!(
            fiscal_period_from_title("NVIDIA (NVDA) Q3 2025 Earnings Call Transcript"),
            (3, 2025)
        );
        assert_eq!(fiscal_period_from_title("Fiscal 2024 results call"), (1, 2024));
        let (q, y) = fiscal_period_from_title("No period here");
        assert_eq!(q, 1);
        assert_eq!(y, chrono::Utc::now().year());
    }

    #[test]
    fn test_transcript_links_filtered_and_sorted() {
        let html = r#"
            <a href="/earnings/call-transcripts/2024/05/22/nvidia-nvda-q1-2025-earnings-call-transcript/">Q1</a>
            <a href="https://www.fool.com/earnings/call-transcripts/2024/11/20/nvidia-nvda-q3-2025-earnings-call-transcript/">Q3</a>
            <a href="/earnings/call-transcripts/2024/05/22/nvidia-nvda-q1-2025-earnings-call-transcript/">dup</a>
            <a href="/earnings/call-transcripts/2024/10/30/amd-amd-q3-2024-earnings-call-transcript/">AMD</a>
            <a href="/investing/nvda-stock-news/">news</a>
        "#;
        let urls = transcript_links(html, "https://www.fool.com", "NVDA");
        assert_eq!(
            urls,
            vec![
                "https://www.fool.com/earnings/call-transcripts/2024/11/20/nvidia-nvda-q3-2025-earnings-call-transcript/",
                "https://www.fool.com/earnings/call-transcripts/2024/05/22/nvidia-nvda-q1-2025-earnings-call-transcript/",
            ]
        );
    }

    #[test]
    fn test_extract_article_keeps_lines() {
        let html = r#"<html><body>
            <h1>NVIDIA (NVDA) Q3 2025 Earnings Call Transcript</h1>
            <div class="article-body">
              <p><strong>Jensen Huang</strong> -- <em>CEO</em></p>
              <p>We   delivered a great quarter.</p>
            </div>
        </body></html>"#;
        let (title, text) = extract_article(html).unwrap();
        assert_eq!(title, "NVIDIA (NVDA) Q3 2025 Earnings Call Transcript");
        assert_eq!(text, "Jensen Huang -- CEO\n\nWe delivered a great quarter.");
    }

    #[test]
    fn test_nested_blocks_extracted_once() {
        let html = r#"<html><body><h1>T</h1><div class="article-body">
            <blockquote><p>Quoted line.</p></blockquote>
            <ul><li><p>Item one.</p></li><li>Item two.</li></ul>
            <p>Plain.</p>
        </div></body></html>"#;
        let (_, text) = extract_article(html).unwrap();
        assert_eq!(text, "Quoted line.\n\nItem one.\n\nItem two.\n\nPlain.");
    }

    #[test]
    fn test_extract_article_missing_body() {
        assert!(extract_article("<html><body><p>short</p></body></html>").is_none());
    }
}
