use tracing::info;

use crate::state::Context;

/// Show or clear the result cache (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn cache(
    ctx: Context<'_>,
    #[description = "stats | clear"] action: Option<String>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    let cache = ctx.data().pipeline.cache();
    match action.as_deref().unwrap_or("stats") {
        "stats" => {
            let stats = cache.stats().await?;
            ctx.say(format!(
                "**Cache:**\n\
                 `analyses`: {}\n\
                 `transcript_sets`: {}\n\
                 `scraped_records`: {}\n\
                 `total`: {}",
                stats.analyses,
                stats.transcript_sets,
                stats.scraped_records,
                stats.total()
            ))
            .await?;
        }
        "clear" => {
            let removed = cache.clear().await?;
            info!(user = ctx.author().name, removed, "Cache cleared by admin");
            ctx.say(format!("Cleared {} cache entries.", removed)).await?;
        }
        other => {
            ctx.say(format!("Unknown action `{}`. Valid: `stats`, `clear`", other))
                .await?;
        }
    }

    Ok(())
}
