//! Telegram delivery sink

use async_trait::async_trait;
use oxide_imgbot_core::providers::ImageRecord;
use oxide_imgbot_core::search::DeliverySink;
use teloxide::prelude::*;

/// Posts each delivered image as one message holding only its link.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    /// Sink for `chat_id`
    #[must_use]
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn deliver(&self, record: &ImageRecord) -> anyhow::Result<()> {
        self.bot
            .send_message(self.chat_id, record.reference.as_str())
            .await?;
        Ok(())
    }
}
