mod commands;
mod config;
mod dates;
mod db;
mod dispatch;
mod health;
mod model;
mod notifier;
mod oil;
mod pdf;
mod report;
mod stats;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, InputFile, ParseMode};
use tracing::{debug, info, warn};

use crate::config::{Config, StorageSettings};
use crate::db::{Backend, Db, FileBackend, GistBackend};
use crate::dispatch::{App, Reply, PDF_SENT, PDF_SEND_FAILED};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // Init tracing with env filter, e.g. RUST_LOG=info,reqwest=warn
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reqwest=warn,teloxide=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).compact().init();

    let config = match config_json_arg() {
        Some(json) => {
            info!("Loading config from --config-json");
            Config::from_json_str(&json).context("failed to parse --config-json")?
        }
        None => Config::from_env().context("failed to load config")?,
    };
    info!(
        token = %config.masked_token(),
        delete_password = config.delete_password.is_some(),
        notification_chat = ?config.notification_chat_id,
        port = config.port,
        "Config loaded"
    );

    let backend: Arc<dyn Backend> = match config.storage() {
        StorageSettings::Gist { token, gist_id, file_name } => {
            Arc::new(GistBackend::new(token, gist_id, file_name)?)
        }
        StorageSettings::File { path } => {
            warn!(%path, "GITHUB_TOKEN or GIST_ID missing, using local file");
            Arc::new(FileBackend::new(path))
        }
    };
    let db = Arc::new(Db::open(backend).await);

    let app = Arc::new(App {
        db,
        delete_password: config.delete_password.clone(),
        notification_chat: config.notification_chat_id,
        utc_offset: config.utc_offset()?,
    });

    let bot = Bot::new(config.bot_token.clone());

    let port = config.port;
    tokio::spawn(async move {
        if let Err(err) = health::serve(port).await {
            warn!(error = %err, "Health server failed");
        }
    });

    match config.notification_chat_id {
        Some(chat_id) => {
            let targets = config.notify_times()?;
            tokio::spawn(notifier::run_notifier(bot.clone(), app.clone(), ChatId(chat_id), targets));
        }
        None => warn!("NOTIFICATION_CHAT_ID not set, scheduled advisories disabled"),
    }

    // Log bot identity
    match bot.get_me().await {
        Ok(me) => {
            info!(
                id = me.id.0,
                username = me.user.username.as_deref().unwrap_or(""),
                "Bot started"
            );
        }
        Err(err) => warn!(error = %err, "Failed to fetch bot info"),
    }

    let menu = commands::MENU
        .iter()
        .map(|(command, description)| BotCommand::new(*command, *description));
    if let Err(err) = bot.set_my_commands(menu).await {
        warn!(error = %err, "Failed to register command menu");
    }

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if !app.db.persist().await {
        warn!("Final save failed, last changes may be lost");
    }
    info!("Bot stopped");
    Ok(())
}

/// `--config-json <json>` or `--config-json=<json>`.
fn config_json_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(rest) = arg.strip_prefix("--config-json=") {
            return Some(rest.to_string());
        }
        if arg == "--config-json" {
            return args.next();
        }
    }
    None
}

async fn handle_message(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Only the command word is logged; arguments may carry the delete password.
    info!(
        chat_id = %msg.chat.id,
        from = ?msg.from.as_ref().map(|u| u.id.0),
        command = text.split_whitespace().next().unwrap_or(""),
        "Message received"
    );

    let replies = app.respond(text, app.now()).await;
    deliver(&bot, msg.chat.id, replies).await;
    Ok(())
}

/// Sends replies in order. Failures are logged and the remaining replies still go out.
async fn deliver(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) {
    for reply in replies {
        match reply {
            Reply::Text(text) => send_text(bot, chat_id, text).await,
            Reply::Document { file_name, bytes } => {
                let size = bytes.len();
                let sent = bot
                    .send_document(chat_id, InputFile::memory(bytes).file_name(file_name))
                    .await;
                let follow_up = match sent {
                    Ok(_) => {
                        info!(chat_id = %chat_id, size, "Document sent");
                        PDF_SENT
                    }
                    Err(err) => {
                        warn!(chat_id = %chat_id, error = %err, "Failed to send document");
                        PDF_SEND_FAILED
                    }
                };
                send_text(bot, chat_id, follow_up.to_string()).await;
            }
        }
    }
}

/// Markdown first; free text such as maintenance descriptions can break the markup,
/// in which case the message is resent as plain text.
async fn send_text(bot: &Bot, chat_id: ChatId, text: String) {
    let markdown = bot
        .send_message(chat_id, text.clone())
        .parse_mode(ParseMode::Markdown)
        .await;
    let Err(err) = markdown else {
        return;
    };
    debug!(chat_id = %chat_id, error = %err, "Markdown rejected, retrying as plain text");
    if let Err(err) = bot.send_message(chat_id, text).await {
        warn!(chat_id = %chat_id, error = %err, "Failed to send message");
    }
}
