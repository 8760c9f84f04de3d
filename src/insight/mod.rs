//! Cross-quarter tone tracking and strategic theme extraction.

pub mod focus;
pub mod prompts;
pub mod tone;

pub use focus::{FocusExtractor, Importance, StrategicFocus};
pub use tone::{AnalysisMethod, Direction, QuarterSentiment, ToneAnalyzer, ToneChange, ToneReport, Trend};
