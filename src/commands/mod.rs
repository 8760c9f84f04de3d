mod analyze;
mod cache;
mod config;
mod segments;
mod transcripts;

use crate::state::Context;

const DEFAULT_EXCHANGE: &str = "nasdaq";

/// Earnings call analysis
#[poise::command(
    slash_command,
    subcommands(
        "analyze::analyze",
        "transcripts::transcripts",
        "segments::segments",
        "cache::cache",
        "config::config"
    )
)]
pub async fn earnings(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a message in Discord-safe chunks (max 1990 chars).
/// Uses ctx.say() for all chunks so follow-ups go through the interaction webhook.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in chunks(text, 1990) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Split on the last newline (or space) before `max` bytes, never inside a char.
fn chunks(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max {
            out.push(remaining);
            break;
        }
        let mut end = max;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        let split_at = remaining[..end]
            .rfind('\n')
            .or_else(|| remaining[..end].rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(end);
        out.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    out
}
