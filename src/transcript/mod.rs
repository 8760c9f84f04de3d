pub mod classify;
pub mod config;
pub mod normalize;
pub mod sections;
pub mod segments;
pub mod select;
pub mod types;

use tracing::{info, warn};

pub use classify::SpeakerClassifier;
pub use config::ParserConfig;
pub use normalize::Normalizer;
pub use sections::SectionSplitter;
pub use segments::SpeakerSegmenter;
pub use select::SentimentSelector;
pub use types::{
    Fallback, ParseQuality, ParsedTranscript, Role, SectionBoundary, SectionSplit, Segment,
    SpeakerType, SplitMethod, TranscriptRecord,
};

/// Turns a scraped transcript into attributed, typed segments.
///
/// Every stage is a pure function of its input, so one parser can be shared
/// across threads and transcripts.
pub struct TranscriptParser {
    normalizer: Normalizer,
    splitter: SectionSplitter,
    segmenter: SpeakerSegmenter,
    classifier: SpeakerClassifier,
    selector: SentimentSelector,
}

impl TranscriptParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            normalizer: Normalizer::new(),
            splitter: SectionSplitter::new(config),
            segmenter: SpeakerSegmenter::new(config),
            classifier: SpeakerClassifier::new(config),
            selector: SentimentSelector::new(config),
        }
    }

    /// Parse one record. Never fails; degraded parses are reported through
    /// `ParsedTranscript::quality`.
    pub fn parse(&self, record: &TranscriptRecord) -> ParsedTranscript {
        let text = self.normalizer.normalize(&record.full_text);

        if text.is_empty() {
            warn!(url = %record.url, "Transcript has no text");
            return ParsedTranscript {
                quarter: record.quarter,
                year: record.year,
                title: record.title.clone(),
                url: record.url.clone(),
                management_remarks: Vec::new(),
                qa_session: Vec::new(),
                total_segments: 0,
                quality: ParseQuality::Empty,
            };
        }

        let split = self.splitter.split(&text);
        let mut fallbacks = Vec::new();
        if split.method == SplitMethod::Heuristic {
            fallbacks.push(Fallback::HeuristicSplit);
        }

        let management = self.segmenter.segment(&split.prepared, Role::Management);
        if management.used_fallback {
            fallbacks.push(Fallback::ParagraphFallback);
        }
        let mut management_remarks = management.segments;
        if !management.used_fallback {
            for seg in &mut management_remarks {
                seg.speaker_type = self.classifier.classify_management(&seg.attribution());
            }
        }

        let mut qa_session = self.segmenter.segment(&split.qa, Role::Qa).segments;
        for seg in &mut qa_session {
            seg.speaker_type = self.classifier.classify(&seg.attribution(), &seg.content);
        }

        let total_segments = management_remarks.len() + qa_session.len();
        let quality = if fallbacks.is_empty() {
            ParseQuality::Confident
        } else {
            ParseQuality::LowConfidence(fallbacks)
        };

        info!(
            period = %format!("Q{} {}", record.quarter, record.year),
            management = management_remarks.len(),
            qa = qa_session.len(),
            quality = quality.label(),
            "Parsed transcript"
        );

        ParsedTranscript {
            quarter: record.quarter,
            year: record.year,
            title: record.title.clone(),
            url: record.url.clone(),
            management_remarks,
            qa_session,
            total_segments,
            quality,
        }
    }

    /// Section text sized for the sentiment model; empty means no signal.
    pub fn select_for_sentiment(&self, segments: &[Segment], role: Role) -> String {
        self.selector.select_for_sentiment(segments, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(full_text: &str) -> TranscriptRecord {
        TranscriptRecord {
            quarter: 3,
            year: 2025,
            title: "NVIDIA (NVDA) Q3 2025 Earnings Call Transcript".to_string(),
            url: "https://example.com/t".to_string(),
            full_text: full_text.to_string(),
            scraped_at: 0,
        }
    }

    fn parser() -> TranscriptParser {
        TranscriptParser::new(&ParserConfig::default())
    }

    fn pad(lead: &str, total: usize, filler: &str) -> String {
        let have = lead.split_whitespace().count();
        let mut out = lead.to_string();
        for _ in have..total {
            out.push(' ');
            out.push_str(filler);
        }
        out
    }

    #[test]
    fn test_prepared_and_qa_scenario() {
        let text = format!(
            "Prepared Remarks: Jensen Huang -- CEO\n{}\nQuestions and Answers\nAnalyst -- Bank X: {}\nJensen Huang -- CEO: {}",
            pad("We delivered record revenue.", 40, "momentum"),
            pad("What drove growth?", 20, "please"),
            pad("Strong demand across every platform.", 40, "momentum"),
        );
        let parsed = parser().parse(&record(&text));

        assert_eq!(parsed.management_remarks.len(), 1);
        let opening = &parsed.management_remarks[0];
        assert_eq!(opening.speaker, "Jensen Huang");
        assert_eq!(opening.speaker_type, SpeakerType::Executive);
        assert_eq!(opening.word_count, 40);

        assert_eq!(parsed.qa_session.len(), 2);
        assert_eq!(parsed.qa_session[0].speaker, "Analyst");
        assert_eq!(parsed.qa_session[0].title.as_deref(), Some("Bank X"));
        assert_eq!(parsed.qa_session[0].speaker_type, SpeakerType::Analyst);
        assert_eq!(parsed.qa_session[1].speaker_type, SpeakerType::Executive);

        assert_eq!(parsed.total_segments, 3);
        assert_eq!(parsed.quality, ParseQuality::Confident);
    }

    #[test]
    fn test_paragraph_fallback_scenario() {
        let paragraph = |n: usize| {
            pad(
                &format!("Paragraph {n} shows our revenue and growth improved this quarter as customers expanded."),
                45,
                "steadily",
            )
        };
        let text = format!("{}\n\n{}\n\n{}", paragraph(1), paragraph(2), paragraph(3));
        let parsed = parser().parse(&record(&text));

        assert_eq!(parsed.management_remarks.len(), 1);
        let synthetic = &parsed.management_remarks[0];
        assert_eq!(synthetic.speaker, "Management");
        assert_eq!(synthetic.speaker_type, SpeakerType::Executive);
        assert!(synthetic.content.contains("Paragraph 1"));
        assert!(parsed.qa_session.is_empty());
        assert_eq!(
            parsed.quality,
            ParseQuality::LowConfidence(vec![Fallback::HeuristicSplit, Fallback::ParagraphFallback])
        );
        assert!(parsed.quality.is_low_confidence());
    }

    #[test]
    fn test_empty_input_scenario() {
        let p = parser();
        let parsed = p.parse(&record(""));
        assert!(parsed.management_remarks.is_empty());
        assert!(parsed.qa_session.is_empty());
        assert_eq!(parsed.total_segments, 0);
        assert_eq!(parsed.quality, ParseQuality::Empty);

        let split = SectionSplitter::new(&ParserConfig::default()).split("");
        assert_eq!((split.prepared.as_str(), split.qa.as_str()), ("", ""));
    }

    #[test]
    fn test_short_unlisted_qa_speakers_are_analysts() {
        let text = format!(
            "Welcome to the call.\nQuestions and Answers\nPat Smith: {}\nLee Wong: {}\nDana Cruz: {}",
            pad("How should we think about margins?", 25, "going"),
            pad("Thinking about the second half now.", 30, "forward"),
            pad("One more on supply.", 18, "timing"),
        );
        let parsed = parser().parse(&record(&text));
        assert_eq!(parsed.qa_session.len(), 3);
        for seg in &parsed.qa_session {
            assert!(seg.word_count < 50);
            assert_eq!(seg.speaker_type, SpeakerType::Analyst, "speaker {}", seg.speaker);
        }
    }

    #[test]
    fn test_total_segments_invariant() {
        let inputs = [
            String::new(),
            "plain words with no structure".to_string(),
            format!(
                "Opening remarks\nJane Roe -- CFO\n{}\nQ&A session\nSam Lee: {}",
                pad("Margins expanded.", 35, "again"),
                pad("Follow up on demand?", 16, "briefly")
            ),
        ];
        let p = parser();
        for input in &inputs {
            let parsed = p.parse(&record(input));
            assert_eq!(
                parsed.total_segments,
                parsed.management_remarks.len() + parsed.qa_session.len()
            );
        }
    }

    #[test]
    fn test_segment_minimums_hold_except_fallback() {
        let text = format!(
            "Prepared Remarks:\nJane Roe -- CFO\n{}\nSam Lee -- COO\n{}\nQuestions and Answers\nPat Smith: {}\nLee Wong: {}",
            pad("Margins expanded.", 35, "again"),
            pad("Too short.", 10, "again"),
            pad("Question on demand?", 16, "briefly"),
            pad("Quick one.", 5, "sure"),
        );
        let parsed = parser().parse(&record(&text));
        assert_eq!(parsed.management_remarks.len(), 1);
        assert_eq!(parsed.qa_session.len(), 1);
        assert!(parsed.management_remarks.iter().all(|s| s.word_count >= 30));
        assert!(parsed.qa_session.iter().all(|s| s.word_count >= 15));
    }

    #[test]
    fn test_markup_is_normalized_before_parsing() {
        let text = format!(
            "<h2>Prepared Remarks:</h2>\n<p>Jane Roe -- CFO</p>\n<p>{}</p>\nImage source: The Motley Fool.\n<h2>Questions &amp; Answers</h2>\n<p>Sam Lee: {}</p>",
            pad("Margins expanded.", 35, "again"),
            pad("Follow up on demand?", 16, "briefly")
        );
        let parsed = parser().parse(&record(&text));
        assert_eq!(parsed.management_remarks.len(), 1);
        assert_eq!(parsed.qa_session.len(), 1);
        assert!(!parsed.management_remarks[0].content.contains('<'));
    }

    #[test]
    fn test_select_for_sentiment_uses_parsed_segments() {
        let text = format!(
            "Prepared Remarks:\nJane Roe -- CFO\n{}\nQuestions and Answers\nSam Lee: {}",
            pad("Margins expanded.", 60, "again"),
            pad("Follow up on demand?", 16, "briefly")
        );
        let p = parser();
        let parsed = p.parse(&record(&text));
        let mgmt = p.select_for_sentiment(&parsed.management_remarks, Role::Management);
        assert!(mgmt.starts_with("Margins expanded."));
        // The only Q&A turn is short, so there is nothing to score.
        assert_eq!(p.select_for_sentiment(&parsed.qa_session, Role::Qa), "");
    }
}
