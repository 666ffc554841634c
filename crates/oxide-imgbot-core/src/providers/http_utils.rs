//! HTTP utilities for providers
//!
//! Common request/response handling shared by the provider adapters.

use super::ProviderError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Creates an HTTP client with the given request timeout.
#[must_use]
pub fn create_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends an HTTP GET request with query parameters and returns parsed JSON.
///
/// # Errors
///
/// Returns `ProviderError::Timeout` or `ProviderError::NetworkError` on connectivity issues,
/// `ProviderError::ApiError` on non-success status codes,
/// or `ProviderError::Malformed` if the body is not JSON.
pub async fn get_json(
    client: &HttpClient,
    url: &str,
    query: &[(&str, &str)],
    headers: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value, ProviderError> {
    let mut request = client.get(url).query(query);

    for (key, value) in headers {
        request = request.header(*key, *value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        // Proxies answer with HTML error pages
        let trimmed = error_text.trim_start();
        let is_html = trimmed.starts_with("<!DOCTYPE")
            || trimmed.starts_with("<html")
            || trimmed.starts_with("<HTML");

        let clean_message = if is_html {
            format!("API error: {status} (Server returned HTML error page)")
        } else {
            let truncated = crate::utils::truncate_str(&error_text, 500);
            format!("API error: {status} - {truncated}")
        };

        return Err(ProviderError::ApiError(clean_message));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Navigates a JSON value by path segments (string keys and numeric indices).
///
/// ```ignore
/// // Google Translate: [[["cats","кошки",...]],...]
/// let segment = extract_value(&response, &["0", "0", "0"])?;
/// ```
///
/// # Errors
///
/// Returns `ProviderError::Malformed` if a segment is missing.
pub fn extract_value<'a>(response: &'a Value, path: &[&str]) -> Result<&'a Value, ProviderError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                ProviderError::Malformed(format!("Invalid path: missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                ProviderError::Malformed(format!("Invalid path: missing key {segment}"))
            })?;
        }
    }

    Ok(current)
}

/// Extracts a string from a JSON response by navigating a path.
///
/// # Errors
///
/// Returns `ProviderError::Malformed` if the path is invalid or the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, ProviderError> {
    let current = extract_value(response, path)?;
    current.as_str().map(ToString::to_string).ok_or_else(|| {
        ProviderError::Malformed(format!("Expected string at path, got: {current:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_content_mixed_path() -> Result<(), ProviderError> {
        let value = json!({"links": [{"download": "https://img/1"}]});
        assert_eq!(
            extract_text_content(&value, &["links", "0", "download"])?,
            "https://img/1"
        );
        Ok(())
    }

    #[test]
    fn test_extract_text_content_missing_segment() {
        let value = json!([[["cats"]]]);
        let err = extract_text_content(&value, &["1", "0", "0"]);
        assert!(matches!(err, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_extract_text_content_rejects_non_string() {
        let value = json!([[[42]]]);
        let err = extract_text_content(&value, &["0", "0", "0"]);
        assert!(matches!(err, Err(ProviderError::Malformed(_))));
    }
}
