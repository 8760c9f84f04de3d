use anyhow::Result;
use async_trait::async_trait;

use super::{SentimentModel, SentimentScores};

const POSITIVE_WORDS: &[&str] = &["strong", "growth", "increase", "record", "excellent", "outperform"];
const NEGATIVE_WORDS: &[&str] = &["decline", "challenge", "difficult", "concern", "risk", "weakness"];

/// Keyword-count sentiment used when no model is available.
#[derive(Debug, Default, Clone)]
pub struct LexiconModel;

impl LexiconModel {
    pub fn new() -> Self {
        Self
    }

    /// Scores from distinct positive/negative word hits. The winning label gets
    /// `min(0.6 + 0.05 * hits, 0.9)`, a tie is neutral at 0.5, and the other
    /// two labels split the remainder.
    pub fn scores(&self, text: &str) -> SentimentScores {
        let lower = text.to_lowercase();
        let pos = POSITIVE_WORDS.iter().filter(|w| lower.contains(**w)).count();
        let neg = NEGATIVE_WORDS.iter().filter(|w| lower.contains(**w)).count();

        let top = |hits: usize| (0.6 + 0.05 * hits as f64).min(0.9);
        let (positive, negative, neutral) = if pos > neg {
            let c = top(pos);
            (c, (1.0 - c) / 2.0, (1.0 - c) / 2.0)
        } else if neg > pos {
            let c = top(neg);
            ((1.0 - c) / 2.0, c, (1.0 - c) / 2.0)
        } else {
            (0.25, 0.25, 0.5)
        };

        SentimentScores {
            positive,
            negative,
            neutral,
        }
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn score(&self, text: &str) -> Result<SentimentScores> {
        Ok(self.scores(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;

    #[test]
    fn test_positive_confidence_grows_with_hits() {
        let m = LexiconModel::new();
        let one = m.scores("strong quarter");
        assert_eq!(one.label(), SentimentLabel::Positive);
        assert!((one.positive - 0.65).abs() < 1e-9);
        assert!((one.negative - 0.175).abs() < 1e-9);

        let many = m.scores("strong growth, record increase, excellent, we outperform");
        assert!((many.positive - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_negative_and_tie() {
        let m = LexiconModel::new();
        assert_eq!(m.scores("a difficult decline").label(), SentimentLabel::Negative);

        let tie = m.scores("strong growth despite risk and weakness");
        assert_eq!(tie.label(), SentimentLabel::Neutral);
        assert!((tie.neutral - 0.5).abs() < 1e-9);
        assert!((tie.positive - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_scores_sum_to_one() {
        let m = LexiconModel::new();
        for text in ["", "strong", "risk concern", "record growth"] {
            let s = m.scores(text);
            assert!((s.positive + s.negative + s.neutral - 1.0).abs() < 1e-9);
        }
    }
}
