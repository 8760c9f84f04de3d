mod commands;
mod state;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tokio::sync::RwLock;
use tracing::{error, info, Level};

use earnings_lens::cache::ResultCache;
use earnings_lens::insight::{FocusExtractor, ToneAnalyzer};
use earnings_lens::llm::LlmClient;
use earnings_lens::pipeline::{AnalysisConfig, EarningsPipeline};
use earnings_lens::scrape::TranscriptScraper;
use earnings_lens::sentiment::{self, SentimentAnalyzer};
use earnings_lens::transcript::{ParserConfig, TranscriptParser};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let token = dotenv::var("DISCORD_TOKEN").expect("DISCORD_TOKEN required");
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // Init cache
    let cache_dir = PathBuf::from(dotenv::var("CACHE_DIR").unwrap_or_else(|_| "./data/cache".to_string()));
    let cache = Arc::new(ResultCache::new(&cache_dir).await?);
    info!("Result cache initialized at {:?}", cache_dir);

    // LLM is optional; without it tone and focuses use the basic analysis
    let llm = LlmClient::from_env()?.map(Arc::new);
    match &llm {
        Some(client) => info!(model = client.model(), "LLM client initialized"),
        None => info!("No LLM configured, using basic tone and focus analysis"),
    }

    let parser_config = ParserConfig::from_env();
    let parser = Arc::new(TranscriptParser::new(&parser_config));
    let model = sentiment::model_from_env().await;
    let analyzer = Arc::new(SentimentAnalyzer::new(model, &parser_config));
    info!(model = analyzer.model_name(), "Sentiment analyzer ready");

    let scraper = Arc::new(TranscriptScraper::from_env()?);

    // Parse admin user IDs from env
    let admin_ids: HashSet<u64> = dotenv::var("ADMIN_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if !admin_ids.is_empty() {
        info!(count = admin_ids.len(), "Admin users configured");
    }

    let pipeline = Arc::new(EarningsPipeline::new(
        scraper,
        parser,
        analyzer,
        ToneAnalyzer::new(llm.clone()),
        FocusExtractor::new(llm),
        cache,
        Arc::new(RwLock::new(AnalysisConfig::default())),
    ));

    let app_state = AppState { pipeline, admin_ids };

    let intents =
        serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGES;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::earnings()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                for cmd in &framework.options().commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, gid).await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting earnings bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
