//! Storage layer for delivery history
//!
//! Records which image references were delivered to which user. The durable
//! implementation keeps one JSON document per user in Cloudflare R2 / AWS S3.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::ImgbotSettings;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error retrieving object from S3
    #[error("S3 Get error: {0}")]
    S3Get(Box<SdkError<GetObjectError>>),
    /// Error putting object into S3
    #[error("S3 put error: {0}")]
    S3Put(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration error (missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
    /// The storage call did not finish in time
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Images already delivered to one user, keyed by reference.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct SeenImages {
    /// Reference -> time it was first delivered
    pub references: BTreeMap<String, DateTime<Utc>>,
}

/// Persistent (user, image reference) history.
///
/// `mark_seen` must be idempotent and atomic with `has_seen` for the same pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns true if `reference` was already delivered to `user_id`.
    async fn has_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError>;
    /// Records `reference` for `user_id`.
    ///
    /// Returns `true` if the pair was newly inserted, `false` if it already existed.
    async fn mark_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError>;
    /// Check connection to storage
    async fn check_connection(&self) -> Result<(), String>;
}

/// Idle time after which a user's cached history and write lock are dropped
pub const HISTORY_CACHE_IDLE_SECS: u64 = 30 * 60;
/// Lifetime of a cached history document
pub const HISTORY_CACHE_TTL_SECS: u64 = 60 * 60;
/// Maximum number of users kept in the history cache
pub const HISTORY_CACHE_MAX_USERS: u64 = 10_000;

/// Parsed per-user history in front of a durable backend.
///
/// Every cache fill and every read-modify-write of one user runs under that
/// user's lock, so a slow read can never put an older document over a newer
/// one. Writes always start from the durable copy, never from the cache.
pub struct SeenCache {
    entries: Cache<i64, Arc<SeenImages>>,
    locks: Cache<i64, Arc<Mutex<()>>>,
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(HISTORY_CACHE_TTL_SECS),
            Duration::from_secs(HISTORY_CACHE_IDLE_SECS),
        )
    }
}

impl SeenCache {
    /// Cache whose entries expire after `ttl`, or after `idle` without access
    #[must_use]
    pub fn new(ttl: Duration, idle: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(HISTORY_CACHE_MAX_USERS)
                .time_to_live(ttl)
                .time_to_idle(idle)
                .build(),
            // Held only for one store call, far shorter than `idle`
            locks: Cache::builder()
                .max_capacity(HISTORY_CACHE_MAX_USERS)
                .time_to_idle(idle)
                .build(),
        }
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .get_with(user_id, async { Arc::new(Mutex::new(())) })
            .await
    }

    /// History of `user_id`, loading it through `fetch` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`.
    pub async fn read<F, Fut>(&self, user_id: i64, fetch: F) -> Result<Arc<SeenImages>, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<SeenImages>, StorageError>>,
    {
        if let Some(seen) = self.entries.get(&user_id).await {
            return Ok(seen);
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        // Filled by a writer while we waited
        if let Some(seen) = self.entries.get(&user_id).await {
            return Ok(seen);
        }

        debug!(user_id, "History cache miss");
        let seen = Arc::new(fetch().await?.unwrap_or_default());
        self.entries.insert(user_id, seen.clone()).await;
        Ok(seen)
    }

    /// Add `reference` to the durable history of `user_id`.
    ///
    /// Loads the current document through `fetch`, writes the extended one
    /// through `store` and caches it once the write succeeded. Returns `false`
    /// without writing if the reference is already recorded.
    ///
    /// # Errors
    ///
    /// Propagates the errors of `fetch` and `store`; the cache is left as is.
    pub async fn record<F, Fut, S, SFut>(
        &self,
        user_id: i64,
        reference: &str,
        fetch: F,
        store: S,
    ) -> Result<bool, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<SeenImages>, StorageError>>,
        S: FnOnce(Arc<SeenImages>) -> SFut,
        SFut: Future<Output = Result<(), StorageError>>,
    {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut seen = fetch().await?.unwrap_or_default();
        if seen.references.contains_key(reference) {
            debug!(user_id, "Reference already recorded, skipping write");
            self.entries.insert(user_id, Arc::new(seen)).await;
            return Ok(false);
        }

        seen.references.insert(reference.to_string(), Utc::now());
        let seen = Arc::new(seen);
        store(seen.clone()).await?;
        self.entries.insert(user_id, seen).await;
        Ok(true)
    }
}

/// R2-backed history store
pub struct R2Storage {
    client: Client,
    bucket: String,
    cache: SeenCache,
}

impl R2Storage {
    /// Create a new R2 storage instance
    ///
    /// # Errors
    ///
    /// Returns an error if R2 configuration is missing.
    pub async fn new(settings: &ImgbotSettings) -> Result<Self, StorageError> {
        let endpoint_url = settings
            .r2_endpoint_url
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ENDPOINT_URL is missing".into()))?;
        let access_key = settings
            .r2_access_key_id
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ACCESS_KEY_ID is missing".into()))?;
        let secret_key = settings
            .r2_secret_access_key
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_SECRET_ACCESS_KEY is missing".into()))?;
        let bucket = settings
            .r2_bucket_name
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_BUCKET_NAME is missing".into()))?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "r2-storage");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.clone(),
            cache: SeenCache::default(),
        })
    }

    /// Save data as JSON to R2
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization or S3 upload fails.
    pub async fn save_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        let body_bytes = serde_json::to_vec(data)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body_bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StorageError::S3Put(e.to_string()))?;

        Ok(())
    }

    /// Load data from JSON in R2
    ///
    /// # Errors
    ///
    /// Returns an error if S3 download or JSON deserialization fails.
    pub async fn load_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
                    .into_bytes();

                let json_data = serde_json::from_slice(&data)?;
                Ok(Some(json_data))
            }
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => Ok(None),
            Err(e) => Err(StorageError::S3Get(Box::new(e))),
        }
    }
}

#[async_trait]
impl HistoryStore for R2Storage {
    async fn has_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError> {
        let key = user_seen_images_key(user_id);
        let seen = self
            .cache
            .read(user_id, || self.load_json::<SeenImages>(&key))
            .await?;
        Ok(seen.references.contains_key(reference))
    }

    async fn mark_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError> {
        let key = user_seen_images_key(user_id);
        let key = key.as_str();
        self.cache
            .record(
                user_id,
                reference,
                || self.load_json::<SeenImages>(key),
                |seen| async move { self.save_json(key, seen.as_ref()).await },
            )
            .await
    }

    async fn check_connection(&self) -> Result<(), String> {
        match self.client.list_buckets().send().await {
            Ok(_) => {
                info!("Successfully connected to R2 storage.");
                Ok(())
            }
            Err(e) => {
                let err_msg = format!("R2 connectivity test failed: {e:#?}");
                error!("{}", err_msg);
                Err(err_msg)
            }
        }
    }
}

/// Returns the R2 key for a user's delivery history
#[must_use]
pub fn user_seen_images_key(user_id: i64) -> String {
    format!("users/{user_id}/seen_images.json")
}

/// Process-local history store.
///
/// Not durable: history is lost on restart. Used by tests and local dry runs.
#[derive(Default)]
pub struct MemoryHistoryStore {
    users: RwLock<HashMap<i64, SeenImages>>,
}

impl MemoryHistoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with references already seen by `user_id`.
    #[must_use]
    pub fn with_seen(user_id: i64, references: &[&str]) -> Self {
        let now = Utc::now();
        let seen = SeenImages {
            references: references.iter().map(|r| ((*r).to_string(), now)).collect(),
        };
        Self {
            users: RwLock::new(HashMap::from([(user_id, seen)])),
        }
    }

    /// References recorded for `user_id`, in sorted order.
    pub async fn seen_references(&self, user_id: i64) -> Vec<String> {
        let users = self.users.read().await;
        users
            .get(&user_id)
            .map(|seen| seen.references.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn has_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user_id)
            .is_some_and(|seen| seen.references.contains_key(reference)))
    }

    async fn mark_seen(&self, user_id: i64, reference: &str) -> Result<bool, StorageError> {
        let mut users = self.users.write().await;
        let seen = users.entry(user_id).or_default();
        if seen.references.contains_key(reference) {
            return Ok(false);
        }
        seen.references.insert(reference.to_string(), Utc::now());
        Ok(true)
    }

    async fn check_connection(&self) -> Result<(), String> {
        Ok(())
    }
}
