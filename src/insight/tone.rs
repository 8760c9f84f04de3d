use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::sentiment::SentimentResult;

use super::prompts::{self, ANALYST_SYSTEM_PROMPT};

/// Weight of management remarks in the combined quarter score; Q&A gets the rest.
const MANAGEMENT_WEIGHT: f64 = 0.6;
/// Score deltas inside this band count as stable.
const STABLE_BAND: f64 = 0.1;

/// Section sentiment for one quarter plus short excerpts for narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterSentiment {
    pub quarter: u8,
    pub year: i32,
    pub management: SentimentResult,
    pub qa: SentimentResult,
    #[serde(default)]
    pub management_excerpt: String,
    #[serde(default)]
    pub qa_excerpt: String,
}

impl QuarterSentiment {
    pub fn period_label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }

    /// `0.6 * net(management) + 0.4 * net(qa)` where net is positive minus negative.
    pub fn weighted_score(&self) -> f64 {
        MANAGEMENT_WEIGHT * self.management.scores.net() + (1.0 - MANAGEMENT_WEIGHT) * self.qa.scores.net()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improving,
    Deteriorating,
    Stable,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Improving => "improving",
            Direction::Deteriorating => "deteriorating",
            Direction::Stable => "stable",
        }
    }

    fn from_delta(delta: f64, band: f64) -> Self {
        if delta > band {
            Direction::Improving
        } else if delta < -band {
            Direction::Deteriorating
        } else {
            Direction::Stable
        }
    }
}

/// Free-text comparison of two quarters produced by the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToneNarration {
    #[serde(default)]
    pub tone_shift: String,
    #[serde(default)]
    pub confidence_changes: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub strategic_shift: String,
    #[serde(default)]
    pub language_changes: String,
    #[serde(default)]
    pub forward_tone: String,
    #[serde(default, alias = "analysis_confidence")]
    pub confidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneChange {
    pub from_quarter: String,
    pub to_quarter: String,
    pub management_tone_change: Direction,
    pub qa_tone_change: Direction,
    pub overall_change: Direction,
    pub score_change: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<ToneNarration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    ConsistentlyImproving,
    ConsistentlyDeteriorating,
    GenerallyImproving,
    GenerallyDeteriorating,
    Mixed,
    Volatile,
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::ConsistentlyImproving => "consistently_improving",
            Trend::ConsistentlyDeteriorating => "consistently_deteriorating",
            Trend::GenerallyImproving => "generally_improving",
            Trend::GenerallyDeteriorating => "generally_deteriorating",
            Trend::Mixed => "mixed",
            Trend::Volatile => "volatile",
            Trend::InsufficientData => "insufficient_data",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_lowercase())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    LlmEnhanced,
    Basic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneReport {
    pub overall_trend: Trend,
    pub changes: Vec<ToneChange>,
    pub summary: String,
    pub method: AnalysisMethod,
    #[serde(default)]
    pub key_patterns: Vec<String>,
    #[serde(default)]
    pub business_implications: Option<String>,
}

/// Overall trend as narrated by the LLM.
#[derive(Debug, Default, Deserialize)]
struct TrendNarration {
    #[serde(default)]
    trend: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    key_patterns: Vec<String>,
    #[serde(default)]
    business_implications: Option<String>,
}

fn label_change(prev: &SentimentResult, curr: &SentimentResult) -> Direction {
    let diff = curr.label.value() - prev.label.value();
    Direction::from_delta(diff as f64, 0.0)
}

/// Quantitative comparison of two consecutive quarters.
pub fn basic_change(prev: &QuarterSentiment, curr: &QuarterSentiment) -> ToneChange {
    let delta = curr.weighted_score() - prev.weighted_score();
    ToneChange {
        from_quarter: prev.period_label(),
        to_quarter: curr.period_label(),
        management_tone_change: label_change(&prev.management, &curr.management),
        qa_tone_change: label_change(&prev.qa, &curr.qa),
        overall_change: Direction::from_delta(delta, STABLE_BAND),
        score_change: (delta * 1000.0).round() / 1000.0,
        narration: None,
    }
}

/// Majority vote over the changes, "consistently" when the last two
/// deltas also agree in sign.
pub fn overall_trend(changes: &[ToneChange]) -> Trend {
    if changes.is_empty() {
        return Trend::InsufficientData;
    }
    let improving = changes.iter().filter(|c| c.overall_change == Direction::Improving).count();
    let deteriorating = changes.iter().filter(|c| c.overall_change == Direction::Deteriorating).count();

    let recent = &changes[changes.len().saturating_sub(2)..];
    let recent_up = recent.iter().all(|c| c.score_change > 0.0);
    let recent_down = recent.iter().all(|c| c.score_change < 0.0);

    if recent_up && improving > deteriorating {
        Trend::ConsistentlyImproving
    } else if recent_down && deteriorating > improving {
        Trend::ConsistentlyDeteriorating
    } else if improving > deteriorating {
        Trend::GenerallyImproving
    } else if deteriorating > improving {
        Trend::GenerallyDeteriorating
    } else {
        Trend::Mixed
    }
}

pub fn summary(ticker: &str, trend: Trend) -> String {
    match trend {
        Trend::ConsistentlyImproving => format!(
            "{ticker}'s tone has been consistently improving across recent quarters, showing growing confidence."
        ),
        Trend::ConsistentlyDeteriorating => {
            format!("{ticker}'s tone has shown consistent deterioration, indicating potential concerns.")
        }
        Trend::GenerallyImproving => {
            format!("Overall, {ticker}'s tone has been improving, though with some fluctuations.")
        }
        Trend::GenerallyDeteriorating => {
            format!("{ticker}'s tone has generally deteriorated over the analyzed period.")
        }
        Trend::Mixed | Trend::Volatile => {
            format!("{ticker}'s tone has shown mixed signals with no clear directional trend.")
        }
        Trend::InsufficientData => "Need at least 2 quarters for tone change analysis.".to_string(),
    }
}

/// Tracks management and Q&A tone across quarters.
pub struct ToneAnalyzer {
    llm: Option<Arc<LlmClient>>,
}

impl ToneAnalyzer {
    pub fn new(llm: Option<Arc<LlmClient>>) -> Self {
        Self { llm }
    }

    pub async fn analyze(&self, ticker: &str, quarters: &[QuarterSentiment]) -> ToneReport {
        if quarters.len() < 2 {
            return ToneReport {
                overall_trend: Trend::InsufficientData,
                changes: Vec::new(),
                summary: summary(ticker, Trend::InsufficientData),
                method: AnalysisMethod::Basic,
                key_patterns: Vec::new(),
                business_implications: None,
            };
        }

        let mut sorted = quarters.to_vec();
        sorted.sort_by_key(|q| (q.year, q.quarter));

        let mut changes: Vec<ToneChange> = sorted.windows(2).map(|w| basic_change(&w[0], &w[1])).collect();
        let basic_trend = overall_trend(&changes);

        let Some(llm) = &self.llm else {
            return ToneReport {
                overall_trend: basic_trend,
                summary: summary(ticker, basic_trend),
                changes,
                method: AnalysisMethod::Basic,
                key_patterns: Vec::new(),
                business_implications: None,
            };
        };

        let mut narrated = false;
        for (change, pair) in changes.iter_mut().zip(sorted.windows(2)) {
            let prompt = prompts::tone_comparison_prompt(ticker, &pair[0], &pair[1]);
            match llm.chat_json(ANALYST_SYSTEM_PROMPT, &prompt, 1000).await {
                Ok(value) => match serde_json::from_value::<ToneNarration>(value) {
                    Ok(narration) => {
                        change.narration = Some(narration);
                        narrated = true;
                    }
                    Err(e) => warn!(from = %change.from_quarter, "Unusable tone narration: {}", e),
                },
                Err(e) => warn!(from = %change.from_quarter, "Tone narration failed: {:#}", e),
            }
        }

        let prompt = prompts::trend_prompt(ticker, &sorted, &changes);
        let trend_narration = match llm.chat_json(ANALYST_SYSTEM_PROMPT, &prompt, 1000).await {
            Ok(value) => serde_json::from_value::<TrendNarration>(value).ok(),
            Err(e) => {
                warn!(ticker, "Trend narration failed: {:#}", e);
                None
            }
        };

        let (overall, summary_text, key_patterns, implications) = match trend_narration {
            Some(n) => {
                narrated = true;
                let trend = Trend::parse(&n.trend).unwrap_or(basic_trend);
                let text = if n.summary.trim().is_empty() {
                    summary(ticker, trend)
                } else {
                    n.summary
                };
                (trend, text, n.key_patterns, n.business_implications)
            }
            None => (basic_trend, summary(ticker, basic_trend), Vec::new(), None),
        };

        info!(ticker, trend = overall.as_str(), narrated, "Tone analysis complete");
        ToneReport {
            overall_trend: overall,
            changes,
            summary: summary_text,
            method: if narrated {
                AnalysisMethod::LlmEnhanced
            } else {
                AnalysisMethod::Basic
            },
            key_patterns,
            business_implications: implications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::{ScoreSource, SentimentScores};

    fn result(positive: f64, negative: f64) -> SentimentResult {
        let scores = SentimentScores {
            positive,
            negative,
            neutral: 1.0 - positive - negative,
        };
        SentimentResult {
            label: scores.label(),
            confidence: scores.confidence(),
            scores,
            source: ScoreSource::Model,
        }
    }

    fn quarter(quarter: u8, year: i32, mgmt: (f64, f64), qa: (f64, f64)) -> QuarterSentiment {
        QuarterSentiment {
            quarter,
            year,
            management: result(mgmt.0, mgmt.1),
            qa: result(qa.0, qa.1),
            management_excerpt: String::new(),
            qa_excerpt: String::new(),
        }
    }

    #[test]
    fn test_weighted_score() {
        let q = quarter(1, 2024, (0.8, 0.1), (0.5, 0.3));
        assert!((q.weighted_score() - (0.6 * 0.7 + 0.4 * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_basic_change() {
        let prev = quarter(1, 2024, (0.2, 0.6), (0.3, 0.3));
        let curr = quarter(2, 2024, (0.8, 0.1), (0.3, 0.3));
        let change = basic_change(&prev, &curr);
        assert_eq!(change.from_quarter, "Q1 2024");
        assert_eq!(change.to_quarter, "Q2 2024");
        assert_eq!(change.management_tone_change, Direction::Improving);
        assert_eq!(change.qa_tone_change, Direction::Stable);
        assert_eq!(change.overall_change, Direction::Improving);
        assert_eq!(change.score_change, 0.66);
    }

    #[test]
    fn test_small_delta_is_stable() {
        let prev = quarter(1, 2024, (0.50, 0.10), (0.4, 0.2));
        let curr = quarter(2, 2024, (0.55, 0.10), (0.4, 0.2));
        assert_eq!(basic_change(&prev, &curr).overall_change, Direction::Stable);
    }

    #[test]
    fn test_overall_trend_rules() {
        let up = quarter(1, 2024, (0.9, 0.0), (0.9, 0.0));
        let down = quarter(1, 2024, (0.0, 0.9), (0.0, 0.9));
        let mid = quarter(1, 2024, (0.3, 0.3), (0.3, 0.3));

        let rising = vec![basic_change(&down, &mid), basic_change(&mid, &up)];
        assert_eq!(overall_trend(&rising), Trend::ConsistentlyImproving);

        let falling = vec![basic_change(&up, &mid), basic_change(&mid, &down)];
        assert_eq!(overall_trend(&falling), Trend::ConsistentlyDeteriorating);

        let wobble = vec![basic_change(&down, &up), basic_change(&up, &mid), basic_change(&mid, &up)];
        assert_eq!(overall_trend(&wobble), Trend::GenerallyImproving);

        let flat = vec![basic_change(&down, &up), basic_change(&up, &down)];
        assert_eq!(overall_trend(&flat), Trend::Mixed);

        assert_eq!(overall_trend(&[]), Trend::InsufficientData);
    }

    #[tokio::test]
    async fn test_single_quarter_is_insufficient() {
        let analyzer = ToneAnalyzer::new(None);
        let report = analyzer.analyze("NVDA", &[quarter(1, 2024, (0.5, 0.1), (0.5, 0.1))]).await;
        assert_eq!(report.overall_trend, Trend::InsufficientData);
        assert!(report.changes.is_empty());
        assert_eq!(report.method, AnalysisMethod::Basic);
    }

    #[tokio::test]
    async fn test_quarters_sorted_before_comparison() {
        let analyzer = ToneAnalyzer::new(None);
        let quarters = vec![
            quarter(1, 2025, (0.9, 0.0), (0.9, 0.0)),
            quarter(3, 2024, (0.0, 0.9), (0.0, 0.9)),
            quarter(4, 2024, (0.3, 0.3), (0.3, 0.3)),
        ];
        let report = analyzer.analyze("NVDA", &quarters).await;
        let pairs: Vec<_> = report
            .changes
            .iter()
            .map(|c| (c.from_quarter.as_str(), c.to_quarter.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Q3 2024", "Q4 2024"), ("Q4 2024", "Q1 2025")]);
        assert_eq!(report.overall_trend, Trend::ConsistentlyImproving);
        assert!(report.summary.starts_with("NVDA's tone"));
    }

    #[test]
    fn test_trend_parse() {
        assert_eq!(Trend::parse("Generally_Improving"), Some(Trend::GenerallyImproving));
        assert_eq!(Trend::parse("volatile"), Some(Trend::Volatile));
        assert_eq!(Trend::parse("sideways"), None);
    }
}
