//! Session controller
//!
//! Classifies nothing itself: the transport decides which operation a message
//! maps to, the controller runs it against the chat's state.

use super::registry::{ChatKey, SessionRegistry};
use super::session::{parse_batch_size, DeliveryConfig, SearchSession, SessionState};
use super::walker::{BatchOutcome, DeliverySink, DeliveryWalker};
use super::{SearchError, UserInputError};
use crate::providers::{ProviderError, SearchProvider};
use crate::storage::HistoryStore;
use crate::translation::TranslationGate;
use crate::utils::{is_blank, truncate_str};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Runs `search` / `next` / `settings` requests for chats.
pub struct SearchController {
    search: Arc<dyn SearchProvider>,
    gate: TranslationGate,
    walker: DeliveryWalker,
    registry: SessionRegistry<ChatKey>,
    timeout: Duration,
}

impl SearchController {
    /// Wire a controller; `timeout` bounds every search and history store call.
    #[must_use]
    pub fn new(
        search: Arc<dyn SearchProvider>,
        gate: TranslationGate,
        store: Arc<dyn HistoryStore>,
        default_config: DeliveryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            gate,
            walker: DeliveryWalker::new(store, timeout),
            registry: SessionRegistry::new(default_config),
            timeout,
        }
    }

    /// Start a new search and deliver its first batch.
    ///
    /// The previous session of the chat is replaced only once the provider
    /// answered; a failed search leaves it untouched.
    ///
    /// # Errors
    ///
    /// `UserInput(EmptyQuery)` for a blank query, `Provider` if the search
    /// fails or times out, `Storage`/`Delivery` if the first batch aborts.
    #[instrument(skip(self, raw_query, sink), fields(user_id = key.user_id, chat_id = key.chat_id))]
    pub async fn start_search(
        &self,
        key: ChatKey,
        raw_query: &str,
        sink: &dyn DeliverySink,
    ) -> Result<BatchOutcome, SearchError> {
        if is_blank(raw_query) {
            return Err(UserInputError::EmptyQuery.into());
        }

        let chat = self.registry.get_or_create(key).await;
        let mut chat = chat.lock().await;

        let query = self.gate.normalize(raw_query.trim()).await;
        info!(query = %truncate_str(&query, 100), "Starting image search");

        let results = match tokio::time::timeout(self.timeout, self.search.search(&query)).await
        {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                error!("Image search failed: {e}");
                return Err(e.into());
            }
            Err(_) => {
                error!("Image search timed out after {:?}", self.timeout);
                return Err(ProviderError::Timeout(self.timeout).into());
            }
        };
        info!(results = results.len(), "Search returned");

        let batch_size = chat.config.batch_size;
        let session = chat.session.insert(SearchSession::new(query, results));
        self.walker
            .deliver_batch(session, key.user_id, batch_size, sink)
            .await
    }

    /// Deliver the next batch of the chat's current session.
    ///
    /// # Errors
    ///
    /// `UserInput(NoPreviousSearch)` if the chat never searched,
    /// `Storage`/`Delivery` if the batch aborts.
    #[instrument(skip(self, sink), fields(user_id = key.user_id, chat_id = key.chat_id))]
    pub async fn continue_search(
        &self,
        key: ChatKey,
        sink: &dyn DeliverySink,
    ) -> Result<BatchOutcome, SearchError> {
        let chat = self
            .registry
            .get(&key)
            .await
            .ok_or(UserInputError::NoPreviousSearch)?;
        let mut chat = chat.lock().await;

        let batch_size = chat.config.batch_size;
        let session = chat
            .session
            .as_mut()
            .ok_or(UserInputError::NoPreviousSearch)?;

        self.walker
            .deliver_batch(session, key.user_id, batch_size, sink)
            .await
    }

    /// Set the chat's batch size from raw user input.
    ///
    /// # Errors
    ///
    /// `UserInput(InvalidBatchSize)` unless `raw` is a positive integer; the
    /// stored config is left unchanged then.
    #[instrument(skip(self), fields(user_id = key.user_id, chat_id = key.chat_id))]
    pub async fn configure_batch_size(
        &self,
        key: ChatKey,
        raw: &str,
    ) -> Result<NonZeroUsize, SearchError> {
        let batch_size = parse_batch_size(raw)?;

        let chat = self.registry.get_or_create(key).await;
        chat.lock().await.config.batch_size = batch_size;

        info!(batch_size = batch_size.get(), "Batch size updated");
        Ok(batch_size)
    }

    /// Lifecycle state of the chat's session
    pub async fn session_state(&self, key: ChatKey) -> SessionState {
        match self.registry.get(&key).await {
            Some(chat) => chat.lock().await.state(),
            None => SessionState::Empty,
        }
    }

    /// Batch size currently configured for the chat
    pub async fn batch_size(&self, key: ChatKey) -> NonZeroUsize {
        match self.registry.get(&key).await {
            Some(chat) => chat.lock().await.config.batch_size,
            None => self.registry.default_config().batch_size,
        }
    }
}
