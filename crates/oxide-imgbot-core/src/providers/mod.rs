//! External providers
//!
//! Image search and translation are reached through the traits below; each has
//! one concrete HTTP adapter.

mod http_utils;
/// Google Translate public endpoint adapter
pub mod google_translate;
/// Unsplash photo search adapter
pub mod unsplash;

pub use google_translate::GoogleTranslateProvider;
pub use unsplash::UnsplashProvider;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to an external provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Response body could not be parsed or had an unexpected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// The call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// A single image returned by a search provider.
///
/// Dedup identity is `reference` only; the rest is descriptive metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Direct download link, used as the dedup key and sent to the user
    pub reference: String,
    /// Provider-side identifier
    pub id: String,
    /// Human description, if the provider has one
    pub description: Option<String>,
    /// Photographer / author name
    pub author: Option<String>,
    /// Provider page for the image
    pub page_url: Option<String>,
}

impl ImageRecord {
    /// Record carrying only a reference, with the reference doubling as id.
    #[must_use]
    pub fn from_reference(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self {
            id: reference.clone(),
            reference,
            description: None,
            author: None,
            page_url: None,
        }
    }
}

impl PartialEq for ImageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for ImageRecord {}

/// Image search capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search images for `query`, in provider ranking order.
    async fn search(&self, query: &str) -> Result<Vec<ImageRecord>, ProviderError>;
}

/// Translation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate `text` into `target_lang` (ISO 639-1 code).
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_equality_uses_reference_only() {
        let a = ImageRecord {
            reference: "https://img/1".to_string(),
            id: "one".to_string(),
            description: Some("cat".to_string()),
            author: None,
            page_url: None,
        };
        let b = ImageRecord {
            id: "other".to_string(),
            description: None,
            ..a.clone()
        };
        assert_eq!(a, b);
        assert_ne!(a, ImageRecord::from_reference("https://img/2"));
    }
}
