use super::{send_chunked, DEFAULT_EXCHANGE};
use crate::state::Context;

/// List recent transcripts with their segment counts
#[poise::command(slash_command, guild_only)]
pub async fn transcripts(
    ctx: Context<'_>,
    #[description = "Ticker symbol, e.g. NVDA"] ticker: String,
    #[description = "Number of recent quarters (1-8)"]
    #[min = 1]
    #[max = 8]
    quarters: Option<u32>,
    #[description = "Exchange (default nasdaq)"] exchange: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let pipeline = &ctx.data().pipeline;
    let quarters = match quarters {
        Some(q) => q as usize,
        None => pipeline.config().read().await.default_quarters,
    };
    let exchange = exchange.unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

    let (summaries, from_cache) = pipeline.collect(&ticker, &exchange, quarters, true).await?;

    let mut output = format!(
        "**{} transcripts**{}\n\n",
        ticker.to_uppercase(),
        if from_cache { " (cached)" } else { "" }
    );
    for s in &summaries {
        output.push_str(&format!(
            "- **Q{} {}** [{}]({})\n  {} prepared / {} Q&A segments, parse {}\n",
            s.quarter,
            s.year,
            s.title,
            s.transcript_url,
            s.prepared_remarks_count,
            s.qa_count,
            s.parse_quality.label()
        ));
    }

    send_chunked(&ctx, &output).await
}
