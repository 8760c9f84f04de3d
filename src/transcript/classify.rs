use super::config::ParserConfig;
use super::types::SpeakerType;

const EXECUTIVE_TITLES: &[&str] = &[
    "chief executive officer",
    "chief financial officer",
    "chief operating officer",
    "chief technology officer",
    "executive vice president",
    "president",
    "ceo",
    "cfo",
    "coo",
    "investor relations",
    "treasurer",
];

const ANALYST_MARKERS: &[&str] = &[
    "analyst",
    "research",
    "capital",
    "securities",
    "bank",
    "partners",
    "morgan",
    "goldman",
    "barclays",
    "jpmorgan",
    "credit suisse",
    "bernstein",
    "evercore",
    "jefferies",
    "wells fargo",
    "citigroup",
    "mizuho",
    "cowen",
    "oppenheimer",
    "piper sandler",
    "raymond james",
    "keybanc",
    "deutsche",
    "ubs",
];

/// Short markers ("ceo", "ubs") must be whole words; longer ones match as substrings.
fn mentions(haystack: &str, marker: &str) -> bool {
    if marker.len() <= 3 {
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == marker)
    } else {
        haystack.contains(marker)
    }
}

/// Labels speakers as executive, analyst or other.
pub struct SpeakerClassifier {
    executive_markers: Vec<String>,
    analyst_word_threshold: usize,
}

impl SpeakerClassifier {
    pub fn new(config: &ParserConfig) -> Self {
        let mut executive_markers: Vec<String> = config
            .executive_names
            .iter()
            .flat_map(|name| {
                // Full name plus each surname-length part, so "Huang" alone still matches.
                let full = name.to_lowercase();
                let parts: Vec<String> = full
                    .split_whitespace()
                    .filter(|p| p.len() > 2)
                    .map(str::to_string)
                    .collect();
                std::iter::once(full).chain(parts)
            })
            .collect();
        executive_markers.extend(EXECUTIVE_TITLES.iter().map(|t| t.to_string()));

        Self {
            executive_markers,
            analyst_word_threshold: config.analyst_word_threshold,
        }
    }

    pub fn is_executive(&self, speaker: &str) -> bool {
        let speaker = speaker.to_lowercase();
        self.executive_markers
            .iter()
            .any(|marker| mentions(&speaker, marker))
    }

    pub fn is_analyst(&self, speaker: &str) -> bool {
        let speaker = speaker.to_lowercase();
        ANALYST_MARKERS.iter().any(|marker| mentions(&speaker, marker))
    }

    /// Classify a Q&A speaker. Deterministic in its inputs.
    ///
    /// Keyword lists are tried first. Otherwise short turns are taken as
    /// analyst questions and long ones as executive answers; terse executive
    /// replies from unlisted speakers are misclassified by this rule.
    pub fn classify(&self, speaker: &str, content: &str) -> SpeakerType {
        if self.is_executive(speaker) {
            return SpeakerType::Executive;
        }
        if self.is_analyst(speaker) {
            return SpeakerType::Analyst;
        }
        if content.split_whitespace().count() < self.analyst_word_threshold {
            SpeakerType::Analyst
        } else {
            SpeakerType::Executive
        }
    }

    /// Management-side label: no length guess, unlisted speakers are `Other`.
    pub fn classify_management(&self, speaker: &str) -> SpeakerType {
        if self.is_executive(speaker) {
            SpeakerType::Executive
        } else {
            SpeakerType::Other
        }
    }
}
