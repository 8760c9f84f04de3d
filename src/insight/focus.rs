use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{LlmClient, Message};

use super::prompts::{self, ANALYST_SYSTEM_PROMPT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    /// Unknown or missing values read as medium.
    fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("high") => Importance::High,
            Some("low") => Importance::Low,
            _ => Importance::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicFocus {
    pub title: String,
    pub description: String,
    pub importance: Importance,
    /// Keyword hits behind a theme-derived focus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_count: Option<usize>,
}

impl StrategicFocus {
    fn new(title: &str, description: &str, importance: Importance) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            importance,
            keyword_count: None,
        }
    }
}

struct Theme {
    title: &'static str,
    description: &'static str,
    keywords: &'static [&'static str],
}

const THEMES: &[Theme] = &[
    Theme {
        title: "AI Data Center Growth",
        description: "Expansion of AI infrastructure and data center business",
        keywords: &["data center", "datacenter", "ai infrastructure", "gpu compute", "accelerated computing"],
    },
    Theme {
        title: "Gaming Business",
        description: "Consumer graphics and gaming product developments",
        keywords: &["gaming", "geforce", "rtx", "gamers", "console"],
    },
    Theme {
        title: "Automotive AI",
        description: "Self-driving and automotive platform progress",
        keywords: &["automotive", "self-driving", "autonomous vehicle", "adas"],
    },
    Theme {
        title: "Professional Visualization",
        description: "Workstation and content creation solutions",
        keywords: &["professional visualization", "workstation", "content creation", "rendering"],
    },
    Theme {
        title: "AI Software Platform",
        description: "Software ecosystem and AI stack development",
        keywords: &["cuda", "ai software", "inference", "training", "llm", "large language model"],
    },
    Theme {
        title: "Strategic Partnerships",
        description: "Key customer and partner collaborations",
        keywords: &["partnership", "collaboration", "customer", "hyperscaler", "cloud provider"],
    },
    Theme {
        title: "Supply Chain",
        description: "Manufacturing capacity and supply-demand dynamics",
        keywords: &["supply", "demand", "capacity", "manufacturing", "production"],
    },
    Theme {
        title: "Technology Innovation",
        description: "Next-generation product development and roadmap",
        keywords: &["innovation", "research", "development", "next generation", "roadmap"],
    },
];

/// Themes with more hits than this are marked high importance.
const HIGH_IMPORTANCE_HITS: usize = 10;
const MAX_THEMES: usize = 5;

/// Keyword-theme focuses, strongest first. Falls back to two generic focuses.
pub fn focuses_from_keywords(text: &str) -> Vec<StrategicFocus> {
    let lower = text.to_lowercase();
    let mut scored: Vec<(&Theme, usize)> = THEMES
        .iter()
        .map(|theme| {
            let hits = theme.keywords.iter().map(|k| lower.matches(k).count()).sum();
            (theme, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let focuses: Vec<StrategicFocus> = scored
        .into_iter()
        .take(MAX_THEMES)
        .map(|(theme, hits)| StrategicFocus {
            title: theme.title.to_string(),
            description: theme.description.to_string(),
            importance: if hits > HIGH_IMPORTANCE_HITS {
                Importance::High
            } else {
                Importance::Medium
            },
            keyword_count: Some(hits),
        })
        .collect();

    if focuses.is_empty() {
        return vec![
            StrategicFocus::new(
                "Business Performance",
                "Overall business results and financial performance",
                Importance::High,
            ),
            StrategicFocus::new(
                "Market Outlook",
                "Future market opportunities and growth projections",
                Importance::Medium,
            ),
        ];
    }
    focuses
}

/// Parse `- Title: Description (Importance)` lines.
pub fn parse_focus_lines(reply: &str, max: usize) -> Vec<StrategicFocus> {
    let Ok(line_re) = Regex::new(r"^-\s*([^:]+):\s*([^(]+)(?:\((\w+)\))?") else {
        return Vec::new();
    };
    reply
        .lines()
        .filter_map(|line| {
            let caps = line_re.captures(line.trim())?;
            let title = caps[1].trim().trim_matches('*').trim();
            let description = caps[2].trim();
            if title.is_empty() || description.is_empty() {
                return None;
            }
            Some(StrategicFocus::new(
                title,
                description,
                Importance::parse(caps.get(3).map(|m| m.as_str())),
            ))
        })
        .take(max)
        .collect()
}

/// Extracts the strategic themes of a call.
pub struct FocusExtractor {
    llm: Option<Arc<LlmClient>>,
}

impl FocusExtractor {
    pub fn new(llm: Option<Arc<LlmClient>>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, ticker: &str, full_text: &str, max: usize) -> Vec<StrategicFocus> {
        if full_text.trim().is_empty() {
            return Vec::new();
        }

        if let Some(llm) = &self.llm {
            let messages = [
                Message::system(ANALYST_SYSTEM_PROMPT),
                Message::user(prompts::focus_prompt(ticker, full_text)),
            ];
            match llm.chat(&messages, 300).await {
                Ok(reply) => {
                    let focuses = parse_focus_lines(&reply, max);
                    if !focuses.is_empty() {
                        debug!(ticker, count = focuses.len(), "Focuses from LLM");
                        return focuses;
                    }
                    warn!(ticker, "LLM reply had no focus lines, using keyword themes");
                }
                Err(e) => warn!(ticker, "Focus extraction failed, using keyword themes: {:#}", e),
            }
        }

        let mut focuses = focuses_from_keywords(full_text);
        focuses.truncate(max);
        focuses
    }
}
