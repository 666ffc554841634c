use crate::bot;
use crate::bot::handlers::is_from_human;
use crate::config::BotSettings;
use oxide_imgbot_core::config::outbound_timeout;
use oxide_imgbot_core::providers::{GoogleTranslateProvider, ProviderError, UnsplashProvider};
use oxide_imgbot_core::search::{DeliveryConfig, SearchController};
use oxide_imgbot_core::storage::{HistoryStore, R2Storage};
use oxide_imgbot_core::translation::TranslationGate;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let storage = init_storage(&settings).await;

    let controller = match init_controller(&settings, storage) {
        Ok(controller) => Arc::new(controller),
        Err(e) => {
            error!("Failed to initialize image search: {}", e);
            std::process::exit(1);
        }
    };

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    match bot.get_me().await {
        Ok(me) => info!(
            "Connected to Telegram as @{} (id: {})",
            me.user.username.as_deref().unwrap_or_default(),
            me.user.id
        ),
        Err(e) => error!("Failed to fetch bot identity: {}", e),
    }

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_storage(settings: &BotSettings) -> Arc<R2Storage> {
    match R2Storage::new(settings.core.as_ref()).await {
        Ok(s) => {
            info!("R2 Storage initialized.");
            check_storage(&s).await;
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to initialize R2 Storage: {}", e);
            std::process::exit(1);
        }
    }
}

/// Log whether storage is reachable.
///
/// Startup continues either way; storage failures are reported per request.
async fn check_storage(storage: &dyn HistoryStore) -> bool {
    match storage.check_connection().await {
        Ok(()) => true,
        Err(e) => {
            error!("R2 Storage connection check returned error: {}", e);
            false
        }
    }
}

fn init_controller(
    settings: &BotSettings,
    storage: Arc<R2Storage>,
) -> Result<SearchController, ProviderError> {
    let core = settings.core.as_ref();
    let timeout = outbound_timeout();

    let search = UnsplashProvider::new(
        core.unsplash_access_key.as_deref().unwrap_or_default(),
        core.unsplash_api_base.clone(),
        core.unsplash_per_page(),
        timeout,
    )?;
    let translator = GoogleTranslateProvider::new(core.translate_api_base.clone(), timeout);
    let gate = TranslationGate::new(
        Arc::new(translator),
        core.translate_target_lang.clone(),
        timeout,
    );

    info!(
        "Image search initialized (per_page: {}, target_lang: {}, default batch: {}, timeout: {:?})",
        core.unsplash_per_page(),
        core.translate_target_lang,
        core.default_batch_size(),
        timeout
    );

    Ok(SearchController::new(
        Arc::new(search),
        gate,
        storage,
        DeliveryConfig::with_batch_size(core.default_batch_size()),
        timeout,
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(
        Update::filter_message()
            .filter(|msg: Message| msg.text().is_some() && is_from_human(&msg))
            .endpoint(handle_text_message),
    )
}

async fn handle_text_message(
    bot: Bot,
    msg: Message,
    controller: Arc<SearchController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, controller).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

#[cfg(test)]
mod tests {
    use super::check_storage;
    use async_trait::async_trait;
    use oxide_imgbot_core::storage::{HistoryStore, MemoryHistoryStore, StorageError};

    struct UnreachableStore;

    #[async_trait]
    impl HistoryStore for UnreachableStore {
        async fn has_seen(&self, _user_id: i64, _reference: &str) -> Result<bool, StorageError> {
            Err(StorageError::Config("unreachable".into()))
        }

        async fn mark_seen(&self, _user_id: i64, _reference: &str) -> Result<bool, StorageError> {
            Err(StorageError::Config("unreachable".into()))
        }

        async fn check_connection(&self) -> Result<(), String> {
            Err("connection refused".to_string())
        }
    }

    #[tokio::test]
    async fn test_failed_connection_check_does_not_stop_startup() {
        assert!(!check_storage(&UnreachableStore).await);
    }

    #[tokio::test]
    async fn test_reachable_storage_passes_check() {
        assert!(check_storage(&MemoryHistoryStore::new()).await);
    }
}
