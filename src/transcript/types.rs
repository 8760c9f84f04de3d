use serde::{Deserialize, Serialize};

/// One scraped earnings-call transcript, as produced by the scraper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub quarter: u8,
    pub year: i32,
    pub title: String,
    pub url: String,
    pub full_text: String,
    /// Unix seconds at which the page was fetched.
    #[serde(default)]
    pub scraped_at: i64,
}

/// Which half of the call a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Management,
    Qa,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Management => "management",
            Role::Qa => "qa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerType {
    Executive,
    Analyst,
    Other,
}

impl SpeakerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerType::Executive => "executive",
            SpeakerType::Analyst => "analyst",
            SpeakerType::Other => "other",
        }
    }
}

/// A speaker-attributed block of text that passed the meaningful-content filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub speaker: String,
    /// Credential text that followed the speaker delimiter, e.g. "CEO" or "Bank X".
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    pub word_count: usize,
    pub speaker_type: SpeakerType,
}

impl Segment {
    pub fn new(
        speaker: impl Into<String>,
        title: Option<String>,
        content: impl Into<String>,
        speaker_type: SpeakerType,
    ) -> Self {
        let content = content.into();
        Self {
            speaker: speaker.into(),
            title,
            word_count: content.split_whitespace().count(),
            content,
            speaker_type,
        }
    }

    /// Name and title joined, used as classifier input.
    pub fn attribution(&self) -> String {
        match &self.title {
            Some(title) => format!("{} {}", self.speaker, title),
            None => self.speaker.clone(),
        }
    }
}

/// Character offsets (byte indices into the normalized text) of the two section starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBoundary {
    pub prepared_start: Option<usize>,
    pub qa_start: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Prepared-remarks start and Q&A marker both located.
    Markers,
    /// Only the Q&A marker located; everything before it is prepared.
    QaMarkerOnly,
    /// No usable markers; fixed-ratio character split.
    Heuristic,
    /// Nothing to split.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSplit {
    pub prepared: String,
    pub qa: String,
    pub boundary: SectionBoundary,
    pub method: SplitMethod,
}

/// Best-effort path taken during a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    HeuristicSplit,
    ParagraphFallback,
}

/// How much a caller should trust a parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "fallbacks")]
pub enum ParseQuality {
    Confident,
    Empty,
    LowConfidence(Vec<Fallback>),
}

impl ParseQuality {
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, ParseQuality::LowConfidence(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ParseQuality::Confident => "confident",
            ParseQuality::Empty => "empty",
            ParseQuality::LowConfidence(_) => "low_confidence",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTranscript {
    pub quarter: u8,
    pub year: i32,
    pub title: String,
    pub url: String,
    pub management_remarks: Vec<Segment>,
    pub qa_session: Vec<Segment>,
    pub total_segments: usize,
    pub quality: ParseQuality,
}

impl ParsedTranscript {
    pub fn period_label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}

/// Output of segmenting one section.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    /// True when the speaker pattern found nothing and paragraphs were salvaged instead.
    pub used_fallback: bool,
}
