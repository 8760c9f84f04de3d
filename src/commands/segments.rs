use earnings_lens::transcript::{ParsedTranscript, Role, Segment};
use tracing::info;

use super::send_chunked;
use crate::state::Context;

const PREVIEW_CHARS: usize = 160;

/// Show how a transcript was split into speaker segments
#[poise::command(slash_command, guild_only)]
pub async fn segments(
    ctx: Context<'_>,
    #[description = "Transcript URL"] url: String,
    #[description = "management | qa (default both)"] section: Option<String>,
    #[description = "Max segments per section"] limit: Option<u32>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = ctx.author().name, url, "Segment inspection requested");
    let parsed = ctx.data().pipeline.inspect(&url).await?;
    let limit = limit.unwrap_or(10) as usize;

    let roles: &[Role] = match section.as_deref().map(str::to_lowercase).as_deref() {
        Some("management") => &[Role::Management],
        Some("qa") | Some("q&a") => &[Role::Qa],
        _ => &[Role::Management, Role::Qa],
    };

    send_chunked(&ctx, &render(&parsed, roles, limit)).await
}

fn render(parsed: &ParsedTranscript, roles: &[Role], limit: usize) -> String {
    let mut out = format!(
        "**{}** ({})\n{} segments, parse {}\n",
        parsed.title,
        parsed.period_label(),
        parsed.total_segments,
        parsed.quality.label()
    );

    for role in roles {
        let (heading, segments) = match role {
            Role::Management => ("Management remarks", &parsed.management_remarks),
            Role::Qa => ("Q&A session", &parsed.qa_session),
        };
        out.push_str(&format!("\n**{}** ({})\n", heading, segments.len()));
        for seg in segments.iter().take(limit) {
            out.push_str(&line(seg));
        }
        if segments.len() > limit {
            out.push_str(&format!("_… {} more_\n", segments.len() - limit));
        }
    }
    out
}

fn line(seg: &Segment) -> String {
    let preview: String = seg.content.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if seg.content.chars().count() > PREVIEW_CHARS { "…" } else { "" };
    format!(
        "- **{}** [{}] {} words: {}{}\n",
        seg.attribution(),
        seg.speaker_type.as_str(),
        seg.word_count,
        preview,
        ellipsis
    )
}
