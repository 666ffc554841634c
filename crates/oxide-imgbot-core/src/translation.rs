//! Best-effort query normalization.
//!
//! Every failure path of the translation provider collapses to the original
//! text, so callers never see a translation error.

use crate::providers::TranslationProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Normalizes search queries to a target language.
#[derive(Clone)]
pub struct TranslationGate {
    provider: Arc<dyn TranslationProvider>,
    target_lang: String,
    timeout: Duration,
}

impl TranslationGate {
    /// Create a gate translating into `target_lang`
    #[must_use]
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        target_lang: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            target_lang: target_lang.into(),
            timeout,
        }
    }

    /// Language queries are normalized to
    #[must_use]
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// Translate `text` into the gate's target language, or return it unchanged.
    pub async fn normalize(&self, text: &str) -> String {
        self.normalize_to(text, &self.target_lang).await
    }

    /// Translate `text` into `target_lang`, or return it unchanged.
    ///
    /// Falls back to `text` on network errors, timeouts, malformed payloads and
    /// blank translations. A byte-identical translation also yields the input.
    pub async fn normalize_to(&self, text: &str, target_lang: &str) -> String {
        let call = self.provider.translate(text, target_lang);
        let translated = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(translated)) => translated,
            Ok(Err(e)) => {
                warn!("Translation failed, using original query: {e}");
                return text.to_string();
            }
            Err(_) => {
                warn!(
                    "Translation timed out after {:?}, using original query",
                    self.timeout
                );
                return text.to_string();
            }
        };

        if translated == text || translated.trim().is_empty() {
            return text.to_string();
        }

        debug!(target_lang, "Query translated");
        translated
    }
}
