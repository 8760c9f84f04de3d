use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::config::ParserConfig;
use super::types::{Role, Segment, Segmentation, SpeakerType};

/// Phrases of operator scripts and call logistics. A turn with two or more
/// of them is dropped before segmentation.
const OPERATOR_SCRIPT_INDICATORS: &[&str] = &[
    "good afternoon",
    "conference operator",
    "welcome everyone",
    "all lines have been placed on mute",
    "prevent any background noise",
    "operator instructions",
    "please go ahead",
    "thank you operator",
];

/// Lowercase words allowed inside a capitalised title or firm name.
const TITLE_CONNECTORS: &[&str] = &["and", "of", "the", "for", "&"];

/// Speaker labels that never carry management or analyst content.
const SKIP_SPEAKERS: &[&str] = &[
    "operator",
    "contents",
    "image source",
    "prepared remarks",
    "questions and answers",
    "call participants",
    "duration",
];

/// Vocabulary used to recognise substantive paragraphs when no speaker lines exist.
const BUSINESS_KEYWORDS: &[&str] = &[
    "revenue",
    "quarter",
    "growth",
    "performance",
    "results",
    "business",
    "market",
    "customers",
    "products",
    "outlook",
    "margin",
    "demand",
    "guidance",
    "earnings",
    "data center",
    "datacenter",
    "gaming",
    "automotive",
    "artificial intelligence",
    "ai",
];

/// Removed from a section before speaker detection.
const BOILERPLATE_PATTERNS: &[&str] = &[
    r"The Motley Fool\.?",
    r"(?-i)\((?:NASDAQ|NYSE|NYSEMKT|AMEX)?:?\s*[A-Z]{1,5}\s*[+-]?\d*\.?\d*%?\s*\)",
    r"\bQ[1-4]\s+\d{4}\s+Earnings\s+Call(?:\s+Transcript)?",
    r"\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s+\d{4}",
    r"\b\d{1,2}:\d{2}\s*[ap]\.?m\.?\s+ET\b",
    r"Image\s+source[^\n]*",
    r"This article is a transcript of this conference call[^\n]*",
    r"Call\s+Participants:?",
    r"Prepared\s+Remarks:?",
    r"Questions\s+(?:and|&)\s+Answers:?",
    r"Operator\s*:?\s*Good\s+(?:morning|afternoon|evening)\.[^.]*conference\s+operator[^.]*\.",
];

/// Count how many of `needles` occur in an already-lowercased haystack.
/// Needles of three chars or fewer have to stand as whole words.
pub(crate) fn count_mentions(haystack: &str, needles: &[&str]) -> usize {
    needles
        .iter()
        .filter(|needle| {
            if needle.len() <= 3 {
                haystack
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word == **needle)
            } else {
                haystack.contains(**needle)
            }
        })
        .count()
}

fn is_operator_script(content: &str) -> bool {
    count_mentions(&content.to_lowercase(), OPERATOR_SCRIPT_INDICATORS) >= 2
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A speaker line and everything said until the next one.
#[derive(Debug)]
struct Turn {
    speaker: String,
    title: Option<String>,
    lines: Vec<String>,
}

/// Splits a section into speaker-attributed segments.
pub struct SpeakerSegmenter {
    boilerplate: Vec<Regex>,
    speaker_line: Regex,
    inline_title: Regex,
    title_line: Regex,
    listing_line: Regex,
    thanks_opener: Regex,
    paragraph_break: Regex,
    blank_runs: Regex,
    management_min_words: usize,
    qa_min_words: usize,
    fallback_min_words: usize,
    fallback_min_keywords: usize,
    fallback_max_paragraphs: usize,
}

impl SpeakerSegmenter {
    pub fn new(config: &ParserConfig) -> Self {
        let boilerplate = BOILERPLATE_PATTERNS
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .expect("boilerplate pattern")
            })
            .collect();

        Self {
            boilerplate,
            speaker_line: Regex::new(
                r"^(?P<speaker>[A-Z][\w.'’-]*(?:[ \t]+[A-Z][\w.'’-]*){0,4})[ \t]*(?:--|—|–|:|\||-[ \t])[ \t]*(?P<rest>.*)$",
            )
            .expect("speaker pattern"),
            inline_title: Regex::new(r"^(?P<title>[^:|.?!]{1,80}?)[ \t]*(?:--|:|\|)[ \t]*(?P<body>.+)$")
                .expect("inline title pattern"),
            title_line: RegexBuilder::new(
                r"\b(?:officer|president|director|ceo|cfo|coo|analyst|relations|treasurer|controller|head\s+of)\b",
            )
            .case_insensitive(true)
            .build()
            .expect("title line pattern"),
            listing_line: Regex::new(r"^[\w\s.&']+,\s+[\w\s.&']+$").expect("listing pattern"),
            thanks_opener: Regex::new(r"^(?:Thanks?|Thank\s+you),?\s+[A-Z][a-z]+\.\s*")
                .expect("thanks pattern"),
            paragraph_break: Regex::new(r"\n\s*\n").expect("paragraph pattern"),
            blank_runs: Regex::new(r"\n\s*\n(?:\s*\n)+").expect("blank-run pattern"),
            management_min_words: config.management_min_words,
            qa_min_words: config.qa_min_words,
            fallback_min_words: config.fallback_min_words,
            fallback_min_keywords: config.fallback_min_keywords,
            fallback_max_paragraphs: config.fallback_max_paragraphs,
        }
    }

    /// Segment one section. Output keeps document order.
    pub fn segment(&self, text: &str, role: Role) -> Segmentation {
        let cleaned = self.strip_boilerplate(text);
        let min_words = match role {
            Role::Management => self.management_min_words,
            Role::Qa => self.qa_min_words,
        };

        let turns = self.split_turns(&cleaned);
        let turn_count = turns.len();
        let mut segments = Vec::new();

        for turn in turns {
            if !is_meaningful_speaker(&turn.speaker) {
                debug!(speaker = %turn.speaker, "Skipping non-substantive speaker");
                continue;
            }
            let raw = turn.lines.join("\n");
            if is_operator_script(&raw) {
                debug!(speaker = %turn.speaker, "Skipping operator script turn");
                continue;
            }
            let (title_line, content) = self.clean_content(&raw);
            if word_count(&content) < min_words {
                continue;
            }
            let title = turn.title.or(title_line);
            segments.push(Segment::new(turn.speaker, title, content, SpeakerType::Other));
        }

        let mut used_fallback = false;
        if segments.is_empty() && role == Role::Management && !cleaned.trim().is_empty() {
            if let Some(content) = self.salvage_paragraphs(&cleaned) {
                warn!(
                    turns = turn_count,
                    words = word_count(&content),
                    "No usable speaker segments, falling back to paragraph extraction"
                );
                segments.push(Segment::new("Management", None, content, SpeakerType::Executive));
                used_fallback = true;
            }
        }

        Segmentation {
            segments,
            used_fallback,
        }
    }

    pub fn strip_boilerplate(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.boilerplate {
            out = pattern.replace_all(&out, "").into_owned();
        }
        out.trim().to_string()
    }

    fn split_turns(&self, text: &str) -> Vec<Turn> {
        let mut turns: Vec<Turn> = Vec::new();

        for line in text.lines() {
            let line = line.trim();

            if line.eq_ignore_ascii_case("operator") {
                turns.push(Turn {
                    speaker: line.to_string(),
                    title: None,
                    lines: Vec::new(),
                });
                continue;
            }

            if let Some(caps) = self.speaker_line.captures(line) {
                let speaker = caps["speaker"].trim().to_string();
                let (title, first) = self.split_rest(caps["rest"].trim());
                turns.push(Turn {
                    speaker,
                    title,
                    lines: first.into_iter().collect(),
                });
                continue;
            }

            // Text before the first speaker line is header material and dropped.
            if let Some(turn) = turns.last_mut() {
                turn.lines.push(line.to_string());
            }
        }

        turns
    }

    /// Separate the remainder of a speaker line into an optional title and
    /// the first words of the utterance.
    fn split_rest(&self, rest: &str) -> (Option<String>, Option<String>) {
        if rest.is_empty() {
            return (None, None);
        }
        if let Some(caps) = self.inline_title.captures(rest) {
            let title = caps["title"].trim();
            if word_count(title) <= 12 && self.is_credential(title) {
                return (Some(title.to_string()), Some(caps["body"].trim().to_string()));
            }
        }
        let sentence_like = rest.ends_with(['.', '?', '!']);
        if word_count(rest) <= 12 && !sentence_like && self.is_credential(rest) {
            (Some(rest.to_string()), None)
        } else {
            (None, Some(rest.to_string()))
        }
    }

    /// Job title or firm name, never the start of a spoken sentence: at most
    /// ten words, each capitalised, a connector, or a title word such as "analyst".
    fn is_credential(&self, text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        !words.is_empty()
            && words.len() <= 10
            && words.iter().any(|w| w.starts_with(|c: char| c.is_uppercase()))
            && words.iter().all(|w| {
                w.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit())
                    || TITLE_CONNECTORS.contains(&w.to_lowercase().trim_end_matches(','))
                    || self.title_line.is_match(w)
            })
    }

    /// Drop leading title lines and "Thanks, Name." openers, tidy blank lines.
    /// Returns the first title line removed, if any, with the cleaned text.
    fn clean_content(&self, content: &str) -> (Option<String>, String) {
        let mut lines: Vec<&str> = content.lines().map(str::trim).collect();
        while lines.first().map_or(false, |l| l.is_empty()) {
            lines.remove(0);
        }

        // A title line only counts as such when something follows it.
        let mut stripped = None;
        for _ in 0..2 {
            let Some(first) = lines.first() else { break };
            let short = word_count(first) <= 12 && !first.ends_with(['.', '?', '!']);
            let titled = self.title_line.is_match(first) || self.listing_line.is_match(first);
            if lines.len() > 1 && short && titled {
                let line = lines.remove(0);
                stripped.get_or_insert_with(|| line.to_string());
            } else {
                break;
            }
        }

        let joined = lines.join("\n");
        let opened = self.thanks_opener.replace(joined.trim_start(), "");
        let content = self.blank_runs.replace_all(&opened, "\n\n").trim().to_string();
        (stripped, content)
    }

    /// Keep the first few paragraphs that read like business commentary.
    fn salvage_paragraphs(&self, text: &str) -> Option<String> {
        let kept: Vec<&str> = self
            .paragraph_break
            .split(text)
            .map(str::trim)
            .filter(|p| word_count(p) >= self.fallback_min_words)
            .filter(|p| count_mentions(&p.to_lowercase(), BUSINESS_KEYWORDS) >= self.fallback_min_keywords)
            .take(self.fallback_max_paragraphs)
            .collect();

        if kept.is_empty() {
            None
        } else {
            Some(kept.join("\n\n"))
        }
    }
}

fn is_meaningful_speaker(speaker: &str) -> bool {
    let speaker = speaker.to_lowercase();
    !SKIP_SPEAKERS.iter().any(|skip| speaker.contains(skip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> SpeakerSegmenter {
        SpeakerSegmenter::new(&ParserConfig::default())
    }

    fn sentence(n: usize) -> String {
        vec!["growth"; n].join(" ")
    }

    #[test]
    fn test_speaker_with_title_on_own_line() {
        let text = format!("Jensen Huang -- CEO\n{}", sentence(40));
        let out = segmenter().segment(&text, Role::Management);
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert_eq!(seg.speaker, "Jensen Huang");
        assert_eq!(seg.title.as_deref(), Some("CEO"));
        assert_eq!(seg.word_count, 40);
        assert!(!out.used_fallback);
    }

    #[test]
    fn test_inline_title_and_question() {
        let text = format!("Analyst -- Bank X: What drove {}?", sentence(17));
        let out = segmenter().segment(&text, Role::Qa);
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert_eq!(seg.speaker, "Analyst");
        assert_eq!(seg.title.as_deref(), Some("Bank X"));
        assert!(seg.content.starts_with("What drove"));
        assert_eq!(seg.word_count, 19);
    }

    #[test]
    fn test_colon_inside_utterance_is_not_a_title() {
        let text = "Pat Smith: I want to ask about two things: margins and supply constraints, and how the analyst community should think about the shape of demand next year.";
        let out = segmenter().segment(text, Role::Qa);
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert_eq!(seg.title, None);
        assert!(seg.content.starts_with("I want to ask about two things: margins"));
        assert_eq!(seg.word_count, text.split_whitespace().count() - 2);
        assert_eq!(seg.attribution(), "Pat Smith");
    }

    #[test]
    fn test_short_utterance_is_not_a_title() {
        let s = segmenter();
        let (title, body) = s.split_rest("margins and supply");
        assert_eq!(title, None);
        assert_eq!(body.as_deref(), Some("margins and supply"));
        let (title, body) = s.split_rest("Morgan Stanley");
        assert_eq!(title.as_deref(), Some("Morgan Stanley"));
        assert_eq!(body, None);
    }

    #[test]
    fn test_greeting_does_not_drop_executive_turn() {
        let text = format!(
            "Jensen Huang -- CEO\nGood morning and thanks for joining our earnings call. {}",
            sentence(40)
        );
        let out = segmenter().segment(&text, Role::Management);
        assert!(!out.used_fallback);
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].speaker, "Jensen Huang");
    }

    #[test]
    fn test_delimiters() {
        let s = segmenter();
        for line in ["Jane Roe: ", "Jane Roe | ", "Jane Roe - ", "Jane Roe — "] {
            let text = format!("{}{}.", line, sentence(20));
            let out = s.segment(&text, Role::Qa);
            assert_eq!(out.segments.len(), 1, "line: {:?}", line);
            assert_eq!(out.segments[0].speaker, "Jane Roe");
        }
    }

    #[test]
    fn test_operator_and_headers_skipped() {
        let text = format!(
            "Operator\nGood afternoon. My name is Sam and I will be your conference operator today. {}\nCall Participants: {}\nJane Roe -- CFO\n{}",
            sentence(30),
            sentence(30),
            sentence(35)
        );
        let out = segmenter().segment(&text, Role::Management);
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].speaker, "Jane Roe");
    }

    #[test]
    fn test_boilerplate_content_rejected() {
        let text = format!(
            "Sam Lee: Good morning and welcome everyone, please go ahead with {}.",
            sentence(40)
        );
        let out = segmenter().segment(&text, Role::Qa);
        assert!(out.segments.is_empty());
    }

    #[test]
    fn test_role_minimums() {
        let s = segmenter();
        let text = format!("Jane Roe: {}.", sentence(20));
        assert_eq!(s.segment(&text, Role::Qa).segments.len(), 1);
        // Management needs 30 words; no business paragraph to salvage either.
        let mgmt = s.segment(&format!("Jane Roe: {}.", vec!["word"; 20].join(" ")), Role::Management);
        assert!(mgmt.segments.is_empty());
        assert!(!mgmt.used_fallback);
        let short = s.segment(&format!("Jane Roe: {}.", sentence(14)), Role::Qa);
        assert!(short.segments.is_empty());
    }

    #[test]
    fn test_clean_content_strips_titles_and_thanks() {
        let text = format!(
            "Colette Kress --\nExecutive Vice President and Chief Financial Officer\nThanks, Simona. {}",
            sentence(35)
        );
        let out = segmenter().segment(&text, Role::Management);
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert!(seg.content.starts_with("growth"));
        assert_eq!(seg.word_count, 35);
        assert_eq!(
            seg.title.as_deref(),
            Some("Executive Vice President and Chief Financial Officer")
        );
    }

    #[test]
    fn test_document_order_preserved() {
        let text = format!(
            "Alice Smith: {} one.\nBob Jones: {} two.\nCarol White: {} three.",
            sentence(20),
            sentence(20),
            sentence(20)
        );
        let out = segmenter().segment(&text, Role::Qa);
        let speakers: Vec<_> = out.segments.iter().map(|s| s.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Alice Smith", "Bob Jones", "Carol White"]);
    }

    #[test]
    fn test_preamble_before_first_speaker_dropped() {
        let text = format!("some header text {}\nJane Roe: {}.", sentence(40), sentence(20));
        let out = segmenter().segment(&text, Role::Qa);
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].word_count, 20);
    }

    #[test]
    fn test_paragraph_fallback() {
        let para = "our revenue and growth this quarter were driven by strong demand from customers across every market we serve and we expect that momentum to continue into the next period as products ramp and supply improves further";
        let noise = vec!["filler"; 40].join(" ");
        let text = format!("{para}\n\n{noise}\n\n{para}\n\n{para}\n\n{para}");
        let out = segmenter().segment(&text, Role::Management);
        assert!(out.used_fallback);
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert_eq!(seg.speaker, "Management");
        assert_eq!(seg.speaker_type, SpeakerType::Executive);
        assert_eq!(seg.content.matches("our revenue").count(), 3);
    }

    #[test]
    fn test_no_fallback_for_qa() {
        let para = "our revenue and growth this quarter were driven by strong demand from customers across every market we serve and we expect that momentum to continue into the next period as products ramp";
        let out = segmenter().segment(para, Role::Qa);
        assert!(out.segments.is_empty());
        assert!(!out.used_fallback);
    }

    #[test]
    fn test_boilerplate_patterns_removed() {
        let s = segmenter();
        let out = s.strip_boilerplate(
            "NVIDIA (NVDA +1.2%) Q3 2025 Earnings Call Nov 20, 2024, 5:00 p.m. ET\nPrepared Remarks:\nbody",
        );
        assert!(out.starts_with("NVIDIA"));
        assert!(out.ends_with("body"));
        for gone in ["NVDA", "Earnings Call", "2024", "p.m.", "Prepared"] {
            assert!(!out.contains(gone), "left {:?} in {:?}", gone, out);
        }
    }

    #[test]
    fn test_word_count_matches_content() {
        let text = format!("Jane Roe: {}\n\n{} end.", sentence(10), sentence(10));
        let out = segmenter().segment(&text, Role::Qa);
        for seg in &out.segments {
            assert_eq!(seg.word_count, seg.content.split_whitespace().count());
        }
    }
}
