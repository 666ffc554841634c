//! Delivery walker
//!
//! Advances a session's cursor, skipping images the user already has and
//! handing every new one to a [`DeliverySink`] as soon as it is recorded.

use super::session::SearchSession;
use super::SearchError;
use crate::providers::ImageRecord;
use crate::storage::{HistoryStore, StorageError};
use async_trait::async_trait;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Receives images as the walker emits them (one outbound message each).
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Hand `record` to the user.
    async fn deliver(&self, record: &ImageRecord) -> anyhow::Result<()>;
}

/// Result of one `deliver_batch` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// At least one image was emitted
    Delivered {
        /// Emitted references, in order
        references: Vec<String>,
        /// Duplicates skipped on the way
        skipped: usize,
    },
    /// The search returned no results at all
    NoImagesFound,
    /// Nothing new left for this user in the session
    NoMoreImages {
        /// Duplicates skipped on the way
        skipped: usize,
    },
}

impl BatchOutcome {
    /// References emitted by this call
    #[must_use]
    pub fn references(&self) -> &[String] {
        match self {
            Self::Delivered { references, .. } => references,
            Self::NoImagesFound | Self::NoMoreImages { .. } => &[],
        }
    }
}

/// Walks sessions against the history store
#[derive(Clone)]
pub struct DeliveryWalker {
    store: Arc<dyn HistoryStore>,
    timeout: Duration,
}

impl DeliveryWalker {
    /// Create a walker; every store call is bounded by `timeout`
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Emit up to `batch_size` images of `session` that `user_id` has not seen.
    ///
    /// Duplicates are skipped without counting toward the quota. A storage
    /// failure aborts the walk with the cursor left on the failing record.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Storage` if the history store fails or times out,
    /// and `SearchError::Delivery` if the sink rejects an image.
    #[instrument(skip(self, session, sink), fields(cursor = session.cursor(), total = session.results().len()))]
    pub async fn deliver_batch(
        &self,
        session: &mut SearchSession,
        user_id: i64,
        batch_size: NonZeroUsize,
        sink: &dyn DeliverySink,
    ) -> Result<BatchOutcome, SearchError> {
        if session.results().is_empty() {
            return Ok(BatchOutcome::NoImagesFound);
        }

        let mut references = Vec::new();
        let mut skipped = 0;

        while references.len() < batch_size.get() {
            let Some(record) = session.current().cloned() else {
                break;
            };

            if self.bounded(self.store.has_seen(user_id, &record.reference)).await? {
                debug!(cursor = session.cursor(), "Skipping already delivered image");
                session.advance();
                skipped += 1;
                continue;
            }

            // Lost a race with another chat of the same user
            if !self.bounded(self.store.mark_seen(user_id, &record.reference)).await? {
                session.advance();
                skipped += 1;
                continue;
            }

            session.advance();
            sink.deliver(&record)
                .await
                .map_err(|e| SearchError::Delivery(e.to_string()))?;
            references.push(record.reference);
        }

        debug!(
            delivered = references.len(),
            skipped,
            cursor = session.cursor(),
            "Batch walk finished"
        );

        if references.is_empty() {
            Ok(BatchOutcome::NoMoreImages { skipped })
        } else {
            Ok(BatchOutcome::Delivered {
                references,
                skipped,
            })
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryHistoryStore, MockHistoryStore};
    use crate::testing::RecordingSink;

    const USER: i64 = 7;

    fn session(refs: &[&str]) -> SearchSession {
        SearchSession::new(
            "cats",
            refs.iter().map(|r| ImageRecord::from_reference(*r)).collect(),
        )
    }

    fn batch(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
    }

    fn walker(store: impl HistoryStore + 'static) -> DeliveryWalker {
        DeliveryWalker::new(Arc::new(store), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_skips_seen_and_keeps_position() -> Result<(), SearchError> {
        let store = Arc::new(MemoryHistoryStore::with_seen(USER, &["B"]));
        let walker = DeliveryWalker::new(store.clone(), Duration::from_secs(1));
        let sink = RecordingSink::default();
        let mut s = session(&["A", "B", "C", "D"]);

        let first = walker.deliver_batch(&mut s, USER, batch(2), &sink).await?;
        assert_eq!(first.references(), ["A", "C"]);
        assert_eq!(s.cursor(), 3);

        let second = walker.deliver_batch(&mut s, USER, batch(2), &sink).await?;
        assert_eq!(second.references(), ["D"]);
        assert_eq!(s.cursor(), 4);

        assert_eq!(sink.sent().await, ["A", "C", "D"]);
        assert!(store.has_seen(USER, "D").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_results_report_no_images() -> Result<(), SearchError> {
        let sink = RecordingSink::default();
        let mut s = session(&[]);
        let outcome = walker(MemoryHistoryStore::new())
            .deliver_batch(&mut s, USER, batch(1), &sink)
            .await?;
        assert_eq!(outcome, BatchOutcome::NoImagesFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_session_reports_no_more() -> Result<(), SearchError> {
        let sink = RecordingSink::default();
        let walker = walker(MemoryHistoryStore::new());
        let mut s = session(&["A"]);

        walker.deliver_batch(&mut s, USER, batch(5), &sink).await?;
        let outcome = walker.deliver_batch(&mut s, USER, batch(5), &sink).await?;
        assert_eq!(outcome, BatchOutcome::NoMoreImages { skipped: 0 });
        assert_eq!(s.cursor(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_long_duplicate_run_terminates() -> Result<(), SearchError> {
        let refs: Vec<String> = (0..10_000).map(|i| format!("img-{i}")).collect();
        let seen: Vec<&str> = refs.iter().map(String::as_str).collect();
        let store = MemoryHistoryStore::with_seen(USER, &seen);
        let sink = RecordingSink::default();
        let mut s = session(&seen);

        let outcome = walker(store)
            .deliver_batch(&mut s, USER, batch(3), &sink)
            .await?;
        assert_eq!(outcome, BatchOutcome::NoMoreImages { skipped: 10_000 });
        assert_eq!(s.cursor(), 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_without_delivering() {
        let mut store = MockHistoryStore::new();
        store.expect_has_seen().returning(|_, _| {
            Err(StorageError::S3Put("bucket unavailable".to_string()))
        });
        store.expect_mark_seen().never();

        let sink = RecordingSink::default();
        let mut s = session(&["A", "B"]);
        let result = walker(store)
            .deliver_batch(&mut s, USER, batch(2), &sink)
            .await;

        assert!(matches!(result, Err(SearchError::Storage(_))));
        assert_eq!(s.cursor(), 0);
        assert!(sink.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_lost_insert_race_counts_as_skip() -> Result<(), SearchError> {
        let mut store = MockHistoryStore::new();
        store.expect_has_seen().returning(|_, _| Ok(false));
        store
            .expect_mark_seen()
            .returning(|_, reference| Ok(reference != "A"));

        let sink = RecordingSink::default();
        let mut s = session(&["A", "B"]);
        let outcome = walker(store)
            .deliver_batch(&mut s, USER, batch(1), &sink)
            .await?;

        assert_eq!(
            outcome,
            BatchOutcome::Delivered {
                references: vec!["B".to_string()],
                skipped: 1
            }
        );
        Ok(())
    }

    struct SlowStore;

    #[async_trait]
    impl HistoryStore for SlowStore {
        async fn has_seen(&self, _user_id: i64, _reference: &str) -> Result<bool, StorageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(false)
        }

        async fn mark_seen(&self, _user_id: i64, _reference: &str) -> Result<bool, StorageError> {
            Ok(true)
        }

        async fn check_connection(&self) -> Result<(), String> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hanging_store_times_out() {
        let walker = DeliveryWalker::new(Arc::new(SlowStore), Duration::from_millis(50));
        let sink = RecordingSink::default();
        let mut s = session(&["A"]);

        let result = walker.deliver_batch(&mut s, USER, batch(1), &sink).await;
        assert!(matches!(
            result,
            Err(SearchError::Storage(StorageError::Timeout(_)))
        ));
    }
}
