mod config;
mod poller;
mod reaper;
mod telegram;

use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use db::{DBService, models::pack::Pack};
use secrecy::ExposeSecret;
use services::services::{
    bot::BotService,
    reference::DEFAULT_PACK_TOKEN,
    store::{CommandStore, SqliteCommandStore},
};
use utils::logging::{LogFormat, init_tracing};

use crate::{config::Config, telegram::TelegramClient};

#[derive(Debug, Parser)]
#[command(name = "neverforget", version, about = "Chat bot that remembers commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the bot (default)
    Serve,
    /// Make a pack the default for a chat, creating the pack if needed
    BindPack {
        pack: String,
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let db = DBService::new(&config.database_url)
        .await
        .context("Failed to open database")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, db).await,
        Commands::BindPack { pack, chat_id } => bind_pack(&db, &pack, chat_id).await,
    }
}

async fn serve(config: Config, db: DBService) -> anyhow::Result<()> {
    let token = config
        .telegram_token
        .as_ref()
        .with_context(|| format!("{} is not set", config::TOKEN_ENV))?;
    let telegram = TelegramClient::new(token.expose_secret(), config.poll_timeout())?;
    let me = telegram
        .get_me()
        .await
        .context("Failed to authenticate with Telegram")?;
    let username = me.username.unwrap_or_default();

    let store: Arc<dyn CommandStore> = Arc::new(SqliteCommandStore::new(db));
    let reaper = reaper::spawn(store.clone(), config.pending_ttl(), config.reaper_interval());
    let bot = Arc::new(BotService::new(store, config.bot.clone()));

    tokio::select! {
        _ = poller::run(Arc::new(telegram), bot, username, config.poll_timeout()) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
        }
    }

    reaper.abort();
    Ok(())
}

async fn bind_pack(db: &DBService, pack: &str, chat_id: i64) -> anyhow::Result<()> {
    let pack = pack.trim();
    if pack.is_empty() || pack == DEFAULT_PACK_TOKEN {
        bail!("Chats use the default pack unless bound; pick a pack name");
    }
    if pack.contains('.') || pack.contains(char::is_whitespace) {
        bail!("Pack names cannot contain dots or whitespace: {}", pack);
    }

    let pack = Pack::ensure(&db.pool, pack).await?;
    Pack::bind_chat(&db.pool, &pack.name, chat_id).await?;
    tracing::info!(pack = %pack.name, chat_id, "Bound chat to pack");
    Ok(())
}
