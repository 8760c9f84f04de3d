use super::tone::{QuarterSentiment, ToneChange};

pub const ANALYST_SYSTEM_PROMPT: &str =
    "You are a financial analyst specializing in earnings call analysis. Answer only in the requested format.";

/// Characters of transcript text sent for focus extraction.
pub const FOCUS_EXCERPT_CHARS: usize = 8000;
/// Characters of each section excerpt quoted in a tone comparison.
pub const TONE_EXCERPT_CHARS: usize = 500;

fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

pub fn focus_prompt(ticker: &str, transcript: &str) -> String {
    format!(
        r#"Analyze this {ticker} earnings call transcript and identify 3-5 key strategic focuses or initiatives.
For each focus, provide:
1. A short title (2-4 words)
2. A brief description (1-2 sentences)
3. The importance level (high/medium/low)

Focus on major themes like growth drivers, new products, partnerships, capacity and margins.

Transcript excerpt:
{excerpt}

Return as a simple list with format:
- Title: Description (Importance)"#,
        excerpt = clip(transcript, FOCUS_EXCERPT_CHARS),
    )
}

fn quarter_block(q: &QuarterSentiment) -> String {
    format!(
        r#"Management Tone: {} (confidence: {:.2})
Q&A Tone: {} (confidence: {:.2})

Management Excerpt: "{}..."
Q&A Excerpt: "{}...""#,
        q.management.label.as_str(),
        q.management.confidence,
        q.qa.label.as_str(),
        q.qa.confidence,
        clip(&q.management_excerpt, TONE_EXCERPT_CHARS),
        clip(&q.qa_excerpt, TONE_EXCERPT_CHARS),
    )
}

pub fn tone_comparison_prompt(ticker: &str, prev: &QuarterSentiment, curr: &QuarterSentiment) -> String {
    format!(
        r#"Compare the tone, confidence, and messaging between these two {ticker} earnings quarters.

PREVIOUS QUARTER ({prev_label}):
{prev_block}

CURRENT QUARTER ({curr_label}):
{curr_block}

Respond with a JSON object:
{{
    "tone_shift": "How the overall tone changed",
    "confidence_changes": "How confidence evolved (more assertive, cautious, etc.)",
    "key_topics": ["topics", "showing", "notable", "tone", "shifts"],
    "strategic_shift": "Changes in strategic messaging or priorities",
    "language_changes": "Evolution in language style",
    "forward_tone": "Changes in forward-looking statements and guidance tone",
    "analysis_confidence": "high|medium|low"
}}

Look at executive certainty, defensive versus offensive positioning, cautionary language and market outlook."#,
        prev_label = prev.period_label(),
        curr_label = curr.period_label(),
        prev_block = quarter_block(prev),
        curr_block = quarter_block(curr),
    )
}

pub fn trend_prompt(ticker: &str, quarters: &[QuarterSentiment], changes: &[ToneChange]) -> String {
    let progression: Vec<String> = quarters
        .iter()
        .map(|q| {
            format!(
                "{}: Management {} ({:.2}), Q&A {} ({:.2})",
                q.period_label(),
                q.management.label.as_str(),
                q.management.confidence,
                q.qa.label.as_str(),
                q.qa.confidence
            )
        })
        .collect();
    let deltas: Vec<String> = changes
        .iter()
        .map(|c| {
            format!(
                "{} -> {}: Mgmt {}, Q&A {}, Score delta {}",
                c.from_quarter,
                c.to_quarter,
                c.management_tone_change.as_str(),
                c.qa_tone_change.as_str(),
                c.score_change
            )
        })
        .collect();

    format!(
        r#"You are analyzing {ticker}'s earnings call tone across multiple quarters.

QUARTERLY PROGRESSION:
{progression}

QUARTER-TO-QUARTER CHANGES:
{deltas}

Respond with a JSON object:
{{
    "trend": "consistently_improving|consistently_deteriorating|generally_improving|generally_deteriorating|mixed|volatile",
    "summary": "2-3 sentence narrative of the tone evolution and what it suggests",
    "key_patterns": ["notable", "patterns"],
    "business_implications": "What the tone changes suggest about market position and confidence",
    "confidence_in_analysis": "high|medium|low"
}}"#,
        progression = progression.join("\n"),
        deltas = deltas.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_is_char_safe() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("abc", 10), "abc");
    }

    #[test]
    fn test_focus_prompt_truncates_transcript() {
        let transcript = "x".repeat(FOCUS_EXCERPT_CHARS + 500);
        let prompt = focus_prompt("NVDA", &transcript);
        assert!(prompt.contains("NVDA earnings call"));
        assert!(!prompt.contains(&"x".repeat(FOCUS_EXCERPT_CHARS + 1)));
    }
}
