//! Chat session registry
//!
//! Holds one search session and delivery config per chat key.
//! Transport-agnostic: any client maps its user/chat identifiers onto [`ChatKey`].

use super::session::{DeliveryConfig, SearchSession, SessionState};
use moka::future::Cache;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Identifies whose session a request operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatKey {
    /// Requesting user; history is deduplicated per user
    pub user_id: i64,
    /// Chat / channel the request came from
    pub chat_id: i64,
}

impl ChatKey {
    /// Key for `user_id` in `chat_id`
    #[must_use]
    pub const fn new(user_id: i64, chat_id: i64) -> Self {
        Self { user_id, chat_id }
    }
}

/// Mutable per-chat state
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Latest search, if any
    pub session: Option<SearchSession>,
    /// Delivery preferences
    pub config: DeliveryConfig,
}

impl ChatState {
    /// Lifecycle state of the chat's session
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::of(self.session.as_ref())
    }
}

/// Idle time after which a chat's session and settings are dropped
pub const SESSION_IDLE_SECS: u64 = 24 * 60 * 60;
/// Maximum number of chats kept at once
pub const SESSION_MAX_CHATS: u64 = 100_000;

/// Registry of per-chat state.
///
/// Each entry has its own async mutex: holding it for a whole request keeps
/// requests of one chat strictly ordered while other chats proceed.
/// Entries not touched for the idle period are evicted; the chat then starts
/// over with the default config and no session.
pub struct SessionRegistry<Id: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static> {
    chats: Cache<Id, Arc<Mutex<ChatState>>>,
    default_config: DeliveryConfig,
}

impl<Id: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static> Default
    for SessionRegistry<Id>
{
    fn default() -> Self {
        Self::new(DeliveryConfig::default())
    }
}

impl<Id: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static> SessionRegistry<Id> {
    /// Create a new empty registry; new chats start with `default_config`
    #[must_use]
    pub fn new(default_config: DeliveryConfig) -> Self {
        Self::with_idle_ttl(default_config, Duration::from_secs(SESSION_IDLE_SECS))
    }

    /// Registry whose entries expire after `idle` without access
    #[must_use]
    pub fn with_idle_ttl(default_config: DeliveryConfig, idle: Duration) -> Self {
        Self {
            chats: Cache::builder()
                .max_capacity(SESSION_MAX_CHATS)
                .time_to_idle(idle)
                .build(),
            default_config,
        }
    }

    /// Config new chats start with
    #[must_use]
    pub const fn default_config(&self) -> DeliveryConfig {
        self.default_config
    }

    /// Get existing chat state or create a fresh one
    pub async fn get_or_create(&self, id: Id) -> Arc<Mutex<ChatState>> {
        let default_config = self.default_config;
        self.chats
            .get_with(id, async move {
                Arc::new(Mutex::new(ChatState {
                    session: None,
                    config: default_config,
                }))
            })
            .await
    }

    /// Get chat state if it exists
    pub async fn get(&self, id: &Id) -> Option<Arc<Mutex<ChatState>>> {
        self.chats.get(id).await
    }

    /// Drop the chat's state
    pub async fn remove(&self, id: &Id) {
        self.chats.invalidate(id).await;
    }

    /// Number of chats with state
    pub async fn len(&self) -> u64 {
        self.chats.run_pending_tasks().await;
        self.chats.entry_count()
    }

    /// True if no chat has state
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_returns_same_entry() {
        let registry: SessionRegistry<ChatKey> = SessionRegistry::default();
        let key = ChatKey::new(1, 10);

        let first = registry.get_or_create(key).await;
        first.lock().await.config = DeliveryConfig::with_batch_size(3);

        let second = registry.get_or_create(key).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.config.batch_size.get(), 3);
        assert_eq!(registry.len().await, 1);
        assert!(!registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let registry: SessionRegistry<ChatKey> =
            SessionRegistry::new(DeliveryConfig::with_batch_size(2));

        let a = registry.get_or_create(ChatKey::new(1, 10)).await;
        a.lock().await.session = Some(SearchSession::new("cats", Vec::new()));

        // Same user in another chat gets its own state
        let b = registry.get_or_create(ChatKey::new(1, 20)).await;
        let b = b.lock().await;
        assert_eq!(b.state(), SessionState::Empty);
        assert_eq!(b.config.batch_size.get(), 2);

        assert!(registry.get(&ChatKey::new(2, 10)).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_chat_is_evicted() {
        let registry: SessionRegistry<ChatKey> =
            SessionRegistry::with_idle_ttl(DeliveryConfig::default(), Duration::from_millis(50));
        let key = ChatKey::new(1, 10);

        let chat = registry.get_or_create(key).await;
        chat.lock().await.config = DeliveryConfig::with_batch_size(5);
        drop(chat);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(registry.get(&key).await.is_none());
        assert!(registry.is_empty().await);

        // Starts over with the default config
        let chat = registry.get_or_create(key).await;
        assert_eq!(chat.lock().await.config.batch_size.get(), 1);
    }

    #[tokio::test]
    async fn test_remove_drops_chat_state() {
        let registry: SessionRegistry<ChatKey> = SessionRegistry::default();
        let key = ChatKey::new(1, 10);

        registry.get_or_create(key).await;
        registry.get_or_create(ChatKey::new(2, 10)).await;
        registry.remove(&key).await;

        assert!(registry.get(&key).await.is_none());
        assert_eq!(registry.len().await, 1);
    }
}
