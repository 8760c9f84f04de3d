use earnings_lens::pipeline::AnalysisConfig;

use crate::state::Context;

/// Configure analysis parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "default_quarters | cache_ttl_secs | max_focuses"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    if !ctx.data().is_admin(ctx.author().id.get()) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    let shared = ctx.data().pipeline.config();
    let reply = match (param.as_deref(), value) {
        (None, _) => render(&*shared.read().await),
        (Some(key), Some(val)) => match shared.write().await.set(key, val) {
            Ok(()) => format!("`{}` set to {}", key, val),
            Err(e) => e.to_string(),
        },
        (Some(_), None) => {
            "Provide both `param` and `value`. Example: `/earnings config cache_ttl_secs 7200`".to_string()
        }
    };

    ctx.say(reply).await?;
    Ok(())
}

fn render(config: &AnalysisConfig) -> String {
    format!(
        "**Analysis Configuration:**\n\
         `default_quarters`: {}\n\
         `cache_ttl_secs`: {}\n\
         `max_focuses`: {}",
        config.default_quarters, config.cache_ttl_secs, config.max_focuses
    )
}
