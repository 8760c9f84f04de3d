use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::config::ParserConfig;
use super::types::{SectionBoundary, SectionSplit, SplitMethod};

/// Where a marker match puts the section start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Section begins right after the matched header.
    MatchEnd,
    /// Section begins at the matched text itself.
    MatchStart,
    /// Section begins at the start of the line holding the match.
    LineStart,
}

struct Marker {
    name: String,
    pattern: Regex,
    anchor: Anchor,
}

impl Marker {
    fn new(name: &str, pattern: &str, anchor: Anchor) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("section marker pattern");
        Self {
            name: name.to_string(),
            pattern,
            anchor,
        }
    }

    fn locate(&self, text: &str) -> Option<usize> {
        let m = self.pattern.find(text)?;
        Some(match self.anchor {
            Anchor::MatchEnd => m.end(),
            Anchor::MatchStart => m.start(),
            Anchor::LineStart => text[..m.start()].rfind('\n').map(|i| i + 1).unwrap_or(0),
        })
    }
}

/// Evaluate markers in priority order; the first one that matches anywhere wins.
fn first_hit<'a>(markers: &'a [Marker], text: &str) -> Option<(usize, &'a str)> {
    markers
        .iter()
        .find_map(|m| m.locate(text).map(|pos| (pos, m.name.as_str())))
}

/// Finds the boundary between prepared remarks and the Q&A session.
pub struct SectionSplitter {
    prepared_markers: Vec<Marker>,
    executive_markers: Vec<Marker>,
    qa_markers: Vec<Marker>,
    heuristic_ratio: f64,
}

impl SectionSplitter {
    pub fn new(config: &ParserConfig) -> Self {
        let prepared_markers = vec![
            Marker::new("prepared remarks", r"prepared\s+remarks?:?", Anchor::MatchEnd),
            Marker::new("management presentation", r"management\s+presentation:?", Anchor::MatchEnd),
            Marker::new("opening remarks", r"opening\s+remarks?:?", Anchor::MatchEnd),
        ];

        let mut executive_markers: Vec<Marker> = config
            .executive_names
            .iter()
            .map(|name| {
                let words: Vec<String> = name.split_whitespace().map(regex::escape).collect();
                Marker::new(name, &words.join(r"\s+"), Anchor::LineStart)
            })
            .collect();
        executive_markers.extend([
            Marker::new(
                "president and ceo",
                r"president\s+and\s+chief\s+executive\s+officer",
                Anchor::LineStart,
            ),
            Marker::new("chief executive officer", r"chief\s+executive\s+officer", Anchor::LineStart),
            Marker::new("chief financial officer", r"chief\s+financial\s+officer", Anchor::LineStart),
            Marker::new("executive vice president", r"executive\s+vice\s+president", Anchor::LineStart),
        ]);

        let qa_markers = vec![
            Marker::new(
                "questions and answers",
                r"questions?[\s-]*(?:&|and)[\s-]*answers?:?",
                Anchor::MatchStart,
            ),
            Marker::new("q&a session", r"\bq\s*(?:&|and)\s*a\s+session", Anchor::MatchStart),
            Marker::new("analyst questions", r"\banalyst\s+questions?\b", Anchor::MatchStart),
        ];

        Self {
            prepared_markers,
            executive_markers,
            qa_markers,
            heuristic_ratio: config.heuristic_split_ratio,
        }
    }

    /// Locate the raw section starts without resolving them.
    pub fn boundary(&self, text: &str) -> SectionBoundary {
        let prepared_start = match first_hit(&self.prepared_markers, text) {
            Some((pos, name)) => {
                debug!(marker = name, pos, "Prepared remarks marker found");
                Some(pos)
            }
            None => first_hit(&self.executive_markers, text).map(|(pos, name)| {
                debug!(marker = name, pos, "Prepared remarks start taken from executive mention");
                pos
            }),
        };

        let qa_start = first_hit(&self.qa_markers, text).map(|(pos, name)| {
            debug!(marker = name, pos, "Q&A marker found");
            pos
        });

        SectionBoundary {
            prepared_start,
            qa_start,
        }
    }

    /// Split normalized text into (prepared, qa). Never fails; the worst case is
    /// the fixed-ratio split, reported as `SplitMethod::Heuristic`.
    pub fn split(&self, text: &str) -> SectionSplit {
        if text.trim().is_empty() {
            return SectionSplit {
                prepared: String::new(),
                qa: String::new(),
                boundary: SectionBoundary::default(),
                method: SplitMethod::Empty,
            };
        }

        let boundary = self.boundary(text);

        match (boundary.prepared_start, boundary.qa_start) {
            (Some(prepared), Some(qa)) if qa > prepared => SectionSplit {
                prepared: text[prepared..qa].trim().to_string(),
                qa: text[qa..].trim().to_string(),
                boundary,
                method: SplitMethod::Markers,
            },
            (_, Some(qa)) if qa > 0 => SectionSplit {
                prepared: text[..qa].trim().to_string(),
                qa: text[qa..].trim().to_string(),
                boundary,
                method: SplitMethod::QaMarkerOnly,
            },
            _ => {
                let at = ratio_offset(text, self.heuristic_ratio);
                warn!(
                    split_at = at,
                    ratio = self.heuristic_ratio,
                    "No usable section markers, using heuristic split"
                );
                SectionSplit {
                    prepared: text[..at].trim().to_string(),
                    qa: text[at..].trim().to_string(),
                    boundary,
                    method: SplitMethod::Heuristic,
                }
            }
        }
    }
}

/// Byte offset of the char at `ratio` of the text's character count.
fn ratio_offset(text: &str, ratio: f64) -> usize {
    let chars = text.chars().count();
    let target = ((chars as f64) * ratio.clamp(0.0, 1.0)) as usize;
    text.char_indices()
        .nth(target)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
