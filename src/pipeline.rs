use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{cache_key, CacheKind, ResultCache};
use crate::insight::{FocusExtractor, QuarterSentiment, StrategicFocus, ToneAnalyzer, ToneReport};
use crate::scrape::TranscriptScraper;
use crate::sentiment::{SentimentAnalyzer, SentimentResult};
use crate::transcript::{ParseQuality, ParsedTranscript, Role, Segment, TranscriptParser, TranscriptRecord};

/// Characters of section text kept as an excerpt for tone narration.
const EXCERPT_CHARS: usize = 1000;

/// Analysis parameters admins can change at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub default_quarters: usize,
    pub cache_ttl_secs: u64,
    pub max_focuses: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_quarters: 4,
            cache_ttl_secs: 3600,
            max_focuses: 5,
        }
    }
}

impl AnalysisConfig {
    pub const PARAMS: &'static [&'static str] = &["default_quarters", "cache_ttl_secs", "max_focuses"];

    /// Set one parameter by name, rejecting unknown names and out-of-range values.
    pub fn set(&mut self, param: &str, value: u32) -> Result<()> {
        match param {
            "default_quarters" => {
                anyhow::ensure!((1..=8).contains(&value), "`default_quarters` must be between 1 and 8");
                self.default_quarters = value as usize;
            }
            "cache_ttl_secs" => self.cache_ttl_secs = u64::from(value),
            "max_focuses" => {
                anyhow::ensure!((1..=10).contains(&value), "`max_focuses` must be between 1 and 10");
                self.max_focuses = value as usize;
            }
            other => anyhow::bail!(
                "Unknown param `{}`. Valid: {}",
                other,
                Self::PARAMS.iter().map(|p| format!("`{}`", p)).collect::<Vec<_>>().join(", ")
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterReport {
    pub quarter: u8,
    pub year: i32,
    pub transcript_url: String,
    pub management_sentiment: SentimentResult,
    pub qa_sentiment: SentimentResult,
    pub prepared_remarks_count: usize,
    pub qa_count: usize,
    pub parse_quality: ParseQuality,
}

impl QuarterReport {
    pub fn period_label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterFocuses {
    pub quarter: u8,
    pub year: i32,
    pub focuses: Vec<StrategicFocus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub quarters_analyzed: usize,
    pub transcripts: Vec<QuarterReport>,
    pub tone: ToneReport,
    pub strategic_focuses: Vec<QuarterFocuses>,
    pub analyzed_at: i64,
}

/// Segment counts for one transcript, without sentiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub quarter: u8,
    pub year: i32,
    pub title: String,
    pub transcript_url: String,
    pub prepared_remarks_count: usize,
    pub qa_count: usize,
    pub parse_quality: ParseQuality,
    pub collected_at: i64,
}

fn excerpt(segments: &[Segment], take: usize) -> String {
    let joined = segments
        .iter()
        .take(take)
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(EXCERPT_CHARS).collect()
}

/// Scrape → parse → sentiment → tone → focuses, with result caching.
pub struct EarningsPipeline {
    scraper: Arc<TranscriptScraper>,
    parser: Arc<TranscriptParser>,
    sentiment: Arc<SentimentAnalyzer>,
    tone: ToneAnalyzer,
    focus: FocusExtractor,
    cache: Arc<ResultCache>,
    config: Arc<RwLock<AnalysisConfig>>,
}

impl EarningsPipeline {
    pub fn new(
        scraper: Arc<TranscriptScraper>,
        parser: Arc<TranscriptParser>,
        sentiment: Arc<SentimentAnalyzer>,
        tone: ToneAnalyzer,
        focus: FocusExtractor,
        cache: Arc<ResultCache>,
        config: Arc<RwLock<AnalysisConfig>>,
    ) -> Self {
        Self {
            scraper,
            parser,
            sentiment,
            tone,
            focus,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn config(&self) -> &Arc<RwLock<AnalysisConfig>> {
        &self.config
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, kind: CacheKind, key: &str) -> Option<T> {
        let ttl = self.config.read().await.cache_ttl_secs;
        match self.cache.get(kind, key, ttl).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, "Cache read failed: {:#}", e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, kind: CacheKind, key: &str, value: &T) {
        if let Err(e) = self.cache.put(kind, key, value).await {
            warn!(key, "Cache write failed: {:#}", e);
        }
    }

    /// A transcript record, from the record cache when allowed.
    async fn record(&self, url: &str, use_cache: bool) -> Result<Option<TranscriptRecord>> {
        if use_cache {
            match self.cache.get_record(url).await {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => {}
                Err(e) => warn!(url, "Record cache read failed: {:#}", e),
            }
        }

        let Some(record) = self.scraper.scrape(url).await? else {
            return Ok(None);
        };
        if let Err(e) = self.cache.put_record(&record).await {
            warn!(url, "Record cache write failed: {:#}", e);
        }
        Ok(Some(record))
    }

    /// Scrape and parse the latest `quarters` transcripts, skipping pages that fail.
    async fn parsed_transcripts(
        &self,
        ticker: &str,
        exchange: &str,
        quarters: usize,
        use_cache: bool,
    ) -> Result<Vec<(TranscriptRecord, ParsedTranscript)>> {
        let urls = self.scraper.find_transcript_urls(ticker, exchange, quarters).await?;
        if urls.is_empty() {
            anyhow::bail!("No transcripts found for {}", ticker);
        }

        let mut parsed = Vec::new();
        for url in &urls {
            match self.record(url, use_cache).await {
                Ok(Some(record)) => {
                    let transcript = self.parser.parse(&record);
                    parsed.push((record, transcript));
                }
                Ok(None) => warn!(url = %url, "Skipping transcript without article body"),
                Err(e) => warn!(url = %url, "Skipping transcript: {:#}", e),
            }
        }

        if parsed.is_empty() {
            anyhow::bail!("None of the {} transcripts for {} could be scraped", urls.len(), ticker);
        }
        Ok(parsed)
    }

    /// Full analysis. Returns the report and whether it came from the cache.
    pub async fn analyze(
        &self,
        ticker: &str,
        exchange: &str,
        quarters: usize,
        use_cache: bool,
    ) -> Result<(AnalysisReport, bool)> {
        let ticker = ticker.to_uppercase();
        let key = cache_key(&ticker, quarters, CacheKind::Analysis);
        if use_cache {
            if let Some(report) = self.cached::<AnalysisReport>(CacheKind::Analysis, &key).await {
                info!(ticker = %ticker, quarters, "Analysis served from cache");
                return Ok((report, true));
            }
        }

        info!(ticker = %ticker, quarters, "Analysis started");
        let parsed = self.parsed_transcripts(&ticker, exchange, quarters, use_cache).await?;
        let max_focuses = self.config.read().await.max_focuses;

        let mut transcripts = Vec::new();
        let mut sentiments = Vec::new();
        let mut strategic_focuses = Vec::new();

        for (record, transcript) in &parsed {
            let management = self
                .sentiment
                .analyze(&transcript.management_remarks, Role::Management)
                .await;
            let qa = self.sentiment.analyze(&transcript.qa_session, Role::Qa).await;

            sentiments.push(QuarterSentiment {
                quarter: transcript.quarter,
                year: transcript.year,
                management: management.clone(),
                qa: qa.clone(),
                management_excerpt: excerpt(&transcript.management_remarks, 3),
                qa_excerpt: excerpt(&transcript.qa_session, 5),
            });

            transcripts.push(QuarterReport {
                quarter: transcript.quarter,
                year: transcript.year,
                transcript_url: transcript.url.clone(),
                management_sentiment: management,
                qa_sentiment: qa,
                prepared_remarks_count: transcript.management_remarks.len(),
                qa_count: transcript.qa_session.len(),
                parse_quality: transcript.quality.clone(),
            });

            strategic_focuses.push(QuarterFocuses {
                quarter: transcript.quarter,
                year: transcript.year,
                focuses: self.focus.extract(&ticker, &record.full_text, max_focuses).await,
            });
        }

        let tone = self.tone.analyze(&ticker, &sentiments).await;

        let report = AnalysisReport {
            ticker: ticker.clone(),
            quarters_analyzed: transcripts.len(),
            transcripts,
            tone,
            strategic_focuses,
            analyzed_at: chrono::Utc::now().timestamp(),
        };

        self.store(CacheKind::Analysis, &key, &report).await;
        info!(
            ticker = %ticker,
            quarters = report.quarters_analyzed,
            trend = report.tone.overall_trend.as_str(),
            "Analysis complete"
        );
        Ok((report, false))
    }

    /// Scrape and parse without sentiment. Returns summaries and whether they came from the cache.
    pub async fn collect(
        &self,
        ticker: &str,
        exchange: &str,
        quarters: usize,
        use_cache: bool,
    ) -> Result<(Vec<TranscriptSummary>, bool)> {
        let ticker = ticker.to_uppercase();
        let key = cache_key(&ticker, quarters, CacheKind::Transcripts);
        if use_cache {
            if let Some(summaries) = self.cached::<Vec<TranscriptSummary>>(CacheKind::Transcripts, &key).await {
                return Ok((summaries, true));
            }
        }

        let parsed = self.parsed_transcripts(&ticker, exchange, quarters, use_cache).await?;
        let collected_at = chrono::Utc::now().timestamp();
        let summaries: Vec<TranscriptSummary> = parsed
            .iter()
            .map(|(record, t)| TranscriptSummary {
                quarter: t.quarter,
                year: t.year,
                title: record.title.clone(),
                transcript_url: t.url.clone(),
                prepared_remarks_count: t.management_remarks.len(),
                qa_count: t.qa_session.len(),
                parse_quality: t.quality.clone(),
                collected_at,
            })
            .collect();

        self.store(CacheKind::Transcripts, &key, &summaries).await;
        info!(ticker = %ticker, count = summaries.len(), "Transcripts collected");
        Ok((summaries, false))
    }

    /// Parse a single transcript URL, for checking segmentation by eye.
    pub async fn inspect(&self, url: &str) -> Result<ParsedTranscript> {
        let record = self
            .record(url, true)
            .await?
            .with_context(|| format!("No transcript article found at {}", url))?;
        Ok(self.parser.parse(&record))
    }
}
