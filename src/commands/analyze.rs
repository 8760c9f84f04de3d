use tracing::info;

use earnings_lens::insight::AnalysisMethod;
use earnings_lens::pipeline::AnalysisReport;

use super::{send_chunked, DEFAULT_EXCHANGE};
use crate::state::Context;

/// Analyze management and Q&A tone across recent earnings calls
#[poise::command(slash_command, guild_only)]
pub async fn analyze(
    ctx: Context<'_>,
    #[description = "Ticker symbol, e.g. NVDA"] ticker: String,
    #[description = "Number of recent quarters (1-8)"]
    #[min = 1]
    #[max = 8]
    quarters: Option<u32>,
    #[description = "Exchange (default nasdaq)"] exchange: Option<String>,
    #[description = "Bypass cached results"] refresh: Option<bool>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let pipeline = &ctx.data().pipeline;
    let quarters = match quarters {
        Some(q) => q as usize,
        None => pipeline.config().read().await.default_quarters,
    };
    let exchange = exchange.unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

    info!(user = ctx.author().name, ticker, quarters, "Analysis requested");

    let (report, from_cache) = pipeline
        .analyze(&ticker, &exchange, quarters, !refresh.unwrap_or(false))
        .await?;

    send_chunked(&ctx, &render(&report, from_cache)).await
}

fn render(report: &AnalysisReport, from_cache: bool) -> String {
    let method = match report.tone.method {
        AnalysisMethod::LlmEnhanced => "llm enhanced",
        AnalysisMethod::Basic => "basic",
    };
    let mut out = format!(
        "**{} earnings tone** ({} quarters{})\n**Trend:** {} ({})\n{}\n",
        report.ticker,
        report.quarters_analyzed,
        if from_cache { ", cached" } else { "" },
        report.tone.overall_trend.as_str(),
        method,
        report.tone.summary
    );

    out.push_str("\n**Quarters**\n");
    for q in &report.transcripts {
        out.push_str(&format!(
            "- [{}]({}): management {} ({:.2}), Q&A {} ({:.2}), {} prepared / {} Q&A segments",
            q.period_label(),
            q.transcript_url,
            q.management_sentiment.label.as_str(),
            q.management_sentiment.confidence,
            q.qa_sentiment.label.as_str(),
            q.qa_sentiment.confidence,
            q.prepared_remarks_count,
            q.qa_count
        ));
        if q.parse_quality.is_low_confidence() {
            out.push_str(&format!(" _(parse: {})_", q.parse_quality.label()));
        }
        out.push('\n');
    }

    if !report.tone.changes.is_empty() {
        out.push_str("\n**Tone changes**\n");
        for c in &report.tone.changes {
            out.push_str(&format!(
                "- {} → {}: overall {} ({:+.3}), management {}, Q&A {}\n",
                c.from_quarter,
                c.to_quarter,
                c.overall_change.as_str(),
                c.score_change,
                c.management_tone_change.as_str(),
                c.qa_tone_change.as_str()
            ));
            if let Some(narration) = &c.narration {
                if !narration.tone_shift.is_empty() {
                    out.push_str(&format!("  {}\n", narration.tone_shift));
                }
            }
        }
    }

    if !report.tone.key_patterns.is_empty() {
        out.push_str(&format!("\n**Patterns:** {}\n", report.tone.key_patterns.join(", ")));
    }
    if let Some(implications) = &report.tone.business_implications {
        out.push_str(&format!("**Implications:** {}\n", implications));
    }

    if let Some(latest) = report.strategic_focuses.first() {
        out.push_str(&format!("\n**Strategic focuses, Q{} {}**\n", latest.quarter, latest.year));
        for f in &latest.focuses {
            out.push_str(&format!("- **{}** ({}): {}\n", f.title, f.importance.as_str(), f.description));
        }
    }

    out
}
