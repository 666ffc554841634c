//! Testing helpers and mock utilities.
//!
//! Provides convenient constructors for mocked providers and a recording
//! delivery sink.

use crate::providers::{
    ImageRecord, MockSearchProvider, MockTranslationProvider, ProviderError,
};
use crate::search::DeliverySink;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Create a mock search provider that returns `references` for every query.
///
/// # Example
///
/// ```rust,ignore
/// use oxide_imgbot_core::testing::mock_search_results;
///
/// let search = mock_search_results(&["https://img/a", "https://img/b"]);
/// ```
#[must_use]
pub fn mock_search_results(references: &[&str]) -> MockSearchProvider {
    let records: Vec<ImageRecord> = references
        .iter()
        .map(|r| ImageRecord::from_reference(*r))
        .collect();

    let mut mock = MockSearchProvider::new();
    mock.expect_search().returning(move |_| Ok(records.clone()));
    mock
}

/// Create a mock search provider that always fails with a network error.
#[must_use]
pub fn mock_search_failing() -> MockSearchProvider {
    let mut mock = MockSearchProvider::new();
    mock.expect_search()
        .returning(|_| Err(ProviderError::NetworkError("connection reset".to_string())));
    mock
}

/// Create a mock translation provider that echoes its input.
#[must_use]
pub fn mock_translation_identity() -> MockTranslationProvider {
    let mut mock = MockTranslationProvider::new();
    mock.expect_translate()
        .returning(|text, _| Ok(text.to_string()));
    mock
}

/// Sink that records every delivered reference.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// References delivered so far, in order
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, record: &ImageRecord) -> anyhow::Result<()> {
        self.sent.lock().await.push(record.reference.clone());
        Ok(())
    }
}

/// Sink that rejects every image.
pub struct FailingSink;

#[async_trait]
impl DeliverySink for FailingSink {
    async fn deliver(&self, _record: &ImageRecord) -> anyhow::Result<()> {
        anyhow::bail!("chat not found")
    }
}
