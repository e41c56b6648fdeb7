use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;

use tunebot::bot::{self, App};
use tunebot::catalog::HttpCatalog;
use tunebot::config::BotConfig;
use tunebot::dialogue::BrowseDialogueState;
use tunebot::localization;
use tunebot::session::SessionRegistry;
use tunebot::settings::SettingsStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Starting tunebot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    localization::init_localization()?;

    let bot_token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");
    let api_base = env::var("CATALOG_API_BASE").expect("CATALOG_API_BASE must be set");
    let web_base = env::var("CATALOG_WEB_BASE").expect("CATALOG_WEB_BASE must be set");
    let settings_path =
        env::var("TUNEBOT_SETTINGS_FILE").unwrap_or_else(|_| "./settings.json".to_string());

    let config = BotConfig::default();
    let catalog = Arc::new(HttpCatalog::new(&api_base, &config)?);

    let bot = Bot::new(bot_token);
    let me = bot.get_me().await?;
    info!(username = me.username(), "Bot initialized, starting dispatcher");

    let app = Arc::new(App {
        browse_sessions: SessionRegistry::from_config(&config),
        inline_sessions: SessionRegistry::from_config(&config),
        settings: SettingsStore::open(Path::new(&settings_path)),
        replies: bot::browse::ReplyTracker::new(config.reply_track_ttl),
        catalog,
        web_base,
        bot_username: me.username().to_string(),
        config,
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<BrowseDialogueState>, BrowseDialogueState>()
                .endpoint(bot::message_handler),
        )
        .branch(Update::filter_edited_message().endpoint(bot::edited_message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler))
        .branch(Update::filter_inline_query().endpoint(bot::inline_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            app,
            InMemStorage::<BrowseDialogueState>::new()
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
