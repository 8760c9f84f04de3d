pub mod finbert;
pub mod lexicon;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::transcript::{ParserConfig, Role, Segment, SentimentSelector};

pub use finbert::FinbertSession;
pub use lexicon::LexiconModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Ordinal used when comparing quarters.
    pub fn value(&self) -> i8 {
        match self {
            SentimentLabel::Negative => -1,
            SentimentLabel::Neutral => 0,
            SentimentLabel::Positive => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// Three-way probability distribution from a sentiment model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentScores {
    pub fn neutral() -> Self {
        Self {
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
        }
    }

    /// Highest-probability label; ties go to positive, then negative.
    pub fn label(&self) -> SentimentLabel {
        if self.positive >= self.negative && self.positive >= self.neutral {
            SentimentLabel::Positive
        } else if self.negative >= self.neutral {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn confidence(&self) -> f64 {
        self.positive.max(self.negative).max(self.neutral)
    }

    /// Positive minus negative.
    pub fn net(&self) -> f64 {
        self.positive - self.negative
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Model,
    Lexicon,
    /// Nothing substantive was left to score.
    NoSignal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub scores: SentimentScores,
    pub source: ScoreSource,
}

impl SentimentResult {
    pub fn no_signal() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            scores: SentimentScores::neutral(),
            source: ScoreSource::NoSignal,
        }
    }

    fn from_scores(scores: SentimentScores, source: ScoreSource) -> Self {
        Self {
            label: scores.label(),
            confidence: scores.confidence(),
            scores,
            source,
        }
    }
}

/// A text classifier producing a positive/negative/neutral distribution.
/// Implementations truncate input to whatever budget their model has.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, text: &str) -> Result<SentimentScores>;
}

/// Build the configured model from `SENTIMENT_BACKEND` and `SENTIMENT_MODEL`.
/// A FinBERT load failure degrades to the lexicon model.
pub async fn model_from_env() -> Arc<dyn SentimentModel> {
    let backend = dotenv::var("SENTIMENT_BACKEND").unwrap_or_else(|_| "finbert".to_string());
    if backend.eq_ignore_ascii_case("lexicon") {
        info!("Using lexicon sentiment backend");
        return Arc::new(LexiconModel::new());
    }

    let model_name =
        dotenv::var("SENTIMENT_MODEL").unwrap_or_else(|_| finbert::DEFAULT_MODEL.to_string());
    match FinbertSession::spawn(&model_name).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!(model = %model_name, "Failed to load sentiment model, using lexicon: {:#}", e);
            Arc::new(LexiconModel::new())
        }
    }
}

/// Section-level sentiment: selects text from segments and scores it.
pub struct SentimentAnalyzer {
    model: Arc<dyn SentimentModel>,
    fallback: LexiconModel,
    selector: SentimentSelector,
}

impl SentimentAnalyzer {
    pub fn new(model: Arc<dyn SentimentModel>, config: &ParserConfig) -> Self {
        Self {
            model,
            fallback: LexiconModel::new(),
            selector: SentimentSelector::new(config),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn analyze(&self, segments: &[Segment], role: Role) -> SentimentResult {
        let text = self.selector.select_for_sentiment(segments, role);
        if text.is_empty() {
            return SentimentResult::no_signal();
        }

        let result = match self.model.score(&text).await {
            Ok(scores) => SentimentResult::from_scores(scores, ScoreSource::Model),
            Err(e) => {
                warn!(model = self.model.name(), role = role.as_str(), "Sentiment model failed, using lexicon: {:#}", e);
                SentimentResult::from_scores(self.fallback.scores(&text), ScoreSource::Lexicon)
            }
        };

        info!(
            role = role.as_str(),
            label = result.label.as_str(),
            confidence = format!("{:.2}", result.confidence),
            "Section sentiment"
        );
        result
    }
}
