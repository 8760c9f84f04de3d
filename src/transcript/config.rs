use tracing::warn;

/// Tunable thresholds for the transcript parser.
///
/// The split ratio and the analyst length threshold are empirical; they are
/// kept here so they can be tuned per deployment rather than edited in code.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Share of characters treated as prepared remarks when no markers exist.
    pub heuristic_split_ratio: f64,
    /// Unlabelled Q&A speakers with fewer words than this are taken as analysts.
    pub analyst_word_threshold: usize,
    pub management_min_words: usize,
    pub qa_min_words: usize,
    /// Minimum words for a paragraph to survive the no-speaker fallback.
    pub fallback_min_words: usize,
    pub fallback_min_keywords: usize,
    pub fallback_max_paragraphs: usize,
    /// Management segments need more than this many words to be preferred for sentiment.
    pub management_select_min_words: usize,
    pub qa_select_min_words: usize,
    pub max_selected_segments: usize,
    /// Company-specific executive names, matched case-insensitively.
    pub executive_names: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            heuristic_split_ratio: 0.6,
            analyst_word_threshold: 50,
            management_min_words: 30,
            qa_min_words: 15,
            fallback_min_words: 30,
            fallback_min_keywords: 2,
            fallback_max_paragraphs: 3,
            management_select_min_words: 50,
            qa_select_min_words: 30,
            max_selected_segments: 3,
            executive_names: Vec::new(),
        }
    }
}

impl ParserConfig {
    /// Defaults overridden by `EXECUTIVE_NAMES`, `HEURISTIC_SPLIT_RATIO`
    /// and `ANALYST_WORD_THRESHOLD` when present.
    pub fn from_env() -> Self {
        Self::from_vars(|key| dotenv::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the same keys.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(names) = lookup("EXECUTIVE_NAMES") {
            config.executive_names = names
                .split(',')
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();
        }

        if let Some(raw) = lookup("HEURISTIC_SPLIT_RATIO") {
            match raw.parse::<f64>() {
                Ok(ratio) if ratio > 0.0 && ratio < 1.0 => config.heuristic_split_ratio = ratio,
                _ => warn!(value = %raw, "Ignoring invalid HEURISTIC_SPLIT_RATIO"),
            }
        }

        if let Some(raw) = lookup("ANALYST_WORD_THRESHOLD") {
            match raw.parse::<usize>() {
                Ok(n) => config.analyst_word_threshold = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid ANALYST_WORD_THRESHOLD"),
            }
        }

        config
    }
}
