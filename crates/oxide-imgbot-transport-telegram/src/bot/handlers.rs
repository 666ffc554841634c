use crate::bot::commands::ChatCommand;
use crate::bot::sink::TelegramSink;
use crate::bot::views;
use anyhow::Result;
use oxide_imgbot_core::search::{BatchOutcome, ChatKey, SearchController, SearchError};
use oxide_imgbot_core::utils::truncate_str;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info, warn};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// True if the message was written by a human
#[must_use]
pub fn is_from_human(msg: &Message) -> bool {
    msg.from.as_ref().is_some_and(|u| !u.is_bot)
}

/// Session key of the message's author in its chat
#[must_use]
pub fn chat_key(msg: &Message) -> ChatKey {
    ChatKey::new(get_user_id_safe(msg), msg.chat.id.0)
}

/// Handle a text message: run the command it carries, ignore anything else.
///
/// # Errors
///
/// Returns an error if the reply could not be sent.
pub async fn handle_text(bot: Bot, msg: Message, controller: Arc<SearchController>) -> Result<()> {
    let Some(command) = msg.text().and_then(ChatCommand::parse) else {
        return Ok(());
    };

    let key = chat_key(&msg);
    info!(
        user_id = key.user_id,
        chat_id = key.chat_id,
        "Command received: {}",
        truncate_str(msg.text().unwrap_or_default(), 100)
    );

    let reply = match command {
        ChatCommand::Search(query) => {
            let sink = TelegramSink::new(bot.clone(), msg.chat.id);
            batch_reply(controller.start_search(key, &query, &sink).await)
        }
        ChatCommand::Next => {
            let sink = TelegramSink::new(bot.clone(), msg.chat.id);
            batch_reply(controller.continue_search(key, &sink).await)
        }
        ChatCommand::Settings(raw) => match controller.configure_batch_size(key, &raw).await {
            Ok(batch_size) => Some(views::batch_size_set_text(batch_size)),
            Err(e) => Some(failure_reply(&e)),
        },
        ChatCommand::Help => Some(views::HELP_TEXT.to_string()),
    };

    if let Some(reply) = reply {
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

fn batch_reply(result: Result<BatchOutcome, SearchError>) -> Option<String> {
    match result {
        Ok(outcome) => {
            if let BatchOutcome::Delivered {
                references,
                skipped,
            } = &outcome
            {
                info!(delivered = references.len(), skipped, "Batch delivered");
            }
            views::outcome_text(&outcome).map(str::to_string)
        }
        Err(e) => Some(failure_reply(&e)),
    }
}

fn failure_reply(e: &SearchError) -> String {
    match e {
        SearchError::UserInput(_) => warn!("Rejected command: {e}"),
        SearchError::Provider(_) | SearchError::Storage(_) | SearchError::Delivery(_) => {
            error!("Request failed: {e}");
        }
    }
    views::error_text(e).to_string()
}
