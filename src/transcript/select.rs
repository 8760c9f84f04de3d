use regex::Regex;

use super::config::ParserConfig;
use super::segments::count_mentions;
use super::types::{Role, Segment, SpeakerType};

/// Greeting, logistics and site phrases. Two or more in one segment keep it
/// out of the sentiment text.
const BOILERPLATE_INDICATORS: &[&str] = &[
    "good afternoon",
    "good morning",
    "conference operator",
    "welcome everyone",
    "all lines have been placed on mute",
    "prevent any background noise",
    "operator instructions",
    "please go ahead",
    "thank you operator",
    "the motley fool",
    "my name is",
    "image source",
    "earnings call",
];

fn looks_like_boilerplate(content: &str) -> bool {
    count_mentions(&content.to_lowercase(), BOILERPLATE_INDICATORS) >= 2
}

/// Picks the segments worth sending to the sentiment model.
///
/// The model truncates from the end, so the selection is front-loaded with
/// the most substantive speech and stripped of metadata fragments.
pub struct SentimentSelector {
    metadata: Vec<Regex>,
    whitespace: Regex,
    management_min_words: usize,
    qa_min_words: usize,
    max_segments: usize,
}

impl SentimentSelector {
    pub fn new(config: &ParserConfig) -> Self {
        let metadata = [
            r"\([A-Z]{2,5}\s*[+-]?\d*\.?\d*%?\)",
            r"\bQ\d+\s+\d{4}\b",
            r"(?i)\b\d{1,2}:\d{2}\s*[ap]\.?m\.?(?:\s+ET)?",
            r"(?i)\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s+\d{4}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("metadata pattern"))
        .collect();

        Self {
            metadata,
            whitespace: Regex::new(r"\s+").expect("whitespace pattern"),
            management_min_words: config.management_select_min_words,
            qa_min_words: config.qa_select_min_words,
            max_segments: config.max_selected_segments,
        }
    }

    /// Join the chosen segments into one cleaned string. Empty means no signal.
    pub fn select_for_sentiment(&self, segments: &[Segment], role: Role) -> String {
        let chosen: Vec<&Segment> = match role {
            Role::Management => {
                let substantive: Vec<&Segment> = segments
                    .iter()
                    .filter(|s| s.word_count > self.management_min_words)
                    .filter(|s| !looks_like_boilerplate(&s.content))
                    .collect();
                if substantive.is_empty() {
                    segments.iter().take(self.max_segments).collect()
                } else {
                    substantive
                }
            }
            Role::Qa => {
                let answers: Vec<&Segment> = segments
                    .iter()
                    .filter(|s| s.speaker_type == SpeakerType::Executive)
                    .filter(|s| s.word_count > self.qa_min_words)
                    .filter(|s| !looks_like_boilerplate(&s.content))
                    .collect();
                if answers.is_empty() {
                    segments
                        .iter()
                        .filter(|s| s.word_count > self.qa_min_words)
                        .collect()
                } else {
                    answers
                }
            }
        };

        let joined = chosen
            .iter()
            .take(self.max_segments)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        self.strip_metadata(&joined)
    }

    fn strip_metadata(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.metadata {
            out = pattern.replace_all(&out, "").into_owned();
        }
        self.whitespace.replace_all(&out, " ").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, words: usize, speaker_type: SpeakerType) -> Segment {
        let content = format!("{} said", speaker) + &" demand".repeat(words.saturating_sub(2));
        Segment::new(speaker, None, content, speaker_type)
    }

    fn selector() -> SentimentSelector {
        SentimentSelector::new(&ParserConfig::default())
    }

    #[test]
    fn test_management_prefers_long_segments() {
        let segments = vec![
            seg("Short", 40, SpeakerType::Other),
            seg("Long", 60, SpeakerType::Executive),
        ];
        let out = selector().select_for_sentiment(&segments, Role::Management);
        assert!(out.starts_with("Long said"));
        assert!(!out.contains("Short"));
    }

    #[test]
    fn test_management_falls_back_to_first_three() {
        let segments: Vec<Segment> = ["A", "B", "C", "D"]
            .iter()
            .map(|s| seg(s, 35, SpeakerType::Other))
            .collect();
        let out = selector().select_for_sentiment(&segments, Role::Management);
        assert!(out.contains("A said") && out.contains("C said"));
        assert!(!out.contains("D said"));
    }

    #[test]
    fn test_management_caps_at_three() {
        let segments: Vec<Segment> = ["A", "B", "C", "D"]
            .iter()
            .map(|s| seg(s, 80, SpeakerType::Executive))
            .collect();
        let out = selector().select_for_sentiment(&segments, Role::Management);
        assert!(!out.contains("D said"));
    }

    #[test]
    fn test_qa_prefers_executive_answers() {
        let segments = vec![
            seg("Asker", 40, SpeakerType::Analyst),
            seg("Answer", 40, SpeakerType::Executive),
        ];
        let out = selector().select_for_sentiment(&segments, Role::Qa);
        assert!(out.starts_with("Answer said"));
        assert!(!out.contains("Asker"));
    }

    #[test]
    fn test_qa_falls_back_to_any_long_segment() {
        let segments = vec![
            seg("Asker", 40, SpeakerType::Analyst),
            seg("Brief", 20, SpeakerType::Executive),
        ];
        let out = selector().select_for_sentiment(&segments, Role::Qa);
        assert!(out.starts_with("Asker said"));
        assert!(!out.contains("Brief"));
    }

    #[test]
    fn test_qa_no_signal() {
        let segments = vec![seg("Asker", 20, SpeakerType::Analyst)];
        assert_eq!(selector().select_for_sentiment(&segments, Role::Qa), "");
        assert_eq!(selector().select_for_sentiment(&[], Role::Qa), "");
        assert_eq!(selector().select_for_sentiment(&[], Role::Management), "");
    }

    #[test]
    fn test_metadata_stripped_and_whitespace_collapsed() {
        let content = format!(
            "Shares (NVDA +2.5%) rose in Q3 2025 after the 5:00 p.m. ET call on Nov 20, 2024.\n\n{}",
            "demand ".repeat(60)
        );
        let segments = vec![Segment::new("Jane", None, content, SpeakerType::Executive)];
        let out = selector().select_for_sentiment(&segments, Role::Management);
        assert!(out.starts_with("Shares rose in after the call on ."));
        assert!(!out.contains("  "));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_greeting_segments_left_out_of_selection() {
        let greeting = format!(
            "Good morning, my name is Sam and welcome to the earnings call.{}",
            " demand".repeat(60)
        );
        let segments = vec![
            Segment::new("Sam", None, greeting, SpeakerType::Other),
            seg("Jane", 60, SpeakerType::Executive),
        ];
        let out = selector().select_for_sentiment(&segments, Role::Management);
        assert!(out.starts_with("Jane said"));
        assert!(!out.contains("Good morning"));
    }
}
