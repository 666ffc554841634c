//! Google Translate provider
//!
//! Uses the public `translate_a/single` endpoint (`client=gtx`), which needs no
//! API key and auto-detects the source language.

use super::http_utils::{create_http_client, extract_text_content, extract_value, get_json};
use super::{ProviderError, TranslationProvider};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Provider for the public Google Translate endpoint
pub struct GoogleTranslateProvider {
    http_client: HttpClient,
    api_base: String,
    timeout: Duration,
}

impl GoogleTranslateProvider {
    /// Create a new provider against `api_base` (e.g. `https://translate.googleapis.com`)
    #[must_use]
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: create_http_client(timeout),
            api_base: api_base.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_a/single", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError> {
        let query = [
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", target_lang),
            ("dt", "t"),
            ("q", text),
        ];
        let response = get_json(&self.http_client, &self.endpoint(), &query, &[], self.timeout)
            .await?;
        let translated = parse_translation(&response)?;
        debug!(target_lang, "Translation received");
        Ok(translated)
    }
}

/// Joins the translated text of every sentence segment.
///
/// The payload looks like `[[["Cats ", "Кошки ", ...], ["dogs", "собаки", ...]], null, "ru"]`.
fn parse_translation(response: &Value) -> Result<String, ProviderError> {
    let segments = extract_value(response, &["0"])?
        .as_array()
        .ok_or_else(|| ProviderError::Malformed("Expected segment array".to_string()))?;

    if segments.is_empty() {
        return Err(ProviderError::Malformed("No translated segments".to_string()));
    }

    let mut translated = String::new();
    for segment in segments {
        translated.push_str(&extract_text_content(segment, &["0"])?);
    }
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_segment() -> Result<(), ProviderError> {
        let response = json!([[["cats", "кошки", null, null, 10]], null, "ru"]);
        assert_eq!(parse_translation(&response)?, "cats");
        Ok(())
    }

    #[test]
    fn test_parse_joins_all_segments() -> Result<(), ProviderError> {
        let response = json!([
            [["Red cats. ", "Рыжие кошки. ", null, null, 10], ["Black dogs", "Черные собаки", null, null, 10]],
            null,
            "ru"
        ]);
        assert_eq!(parse_translation(&response)?, "Red cats. Black dogs");
        Ok(())
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(parse_translation(&json!({"error": "nope"})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
        assert!(parse_translation(&json!([[[null]]])).is_err());
        assert!(parse_translation(&json!("cats")).is_err());
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let provider =
            GoogleTranslateProvider::new("https://translate.example/", Duration::from_secs(1));
        assert_eq!(
            provider.endpoint(),
            "https://translate.example/translate_a/single"
        );
    }
}
