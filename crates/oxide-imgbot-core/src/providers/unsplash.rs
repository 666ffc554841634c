//! Unsplash provider - photo search
//!
//! Calls `GET /search/photos` with `Client-ID` authorization and maps each hit
//! to an [`ImageRecord`] whose reference is the photo's download link.

use super::http_utils::{create_http_client, get_json};
use super::{ImageRecord, ProviderError, SearchProvider};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Provider for Unsplash photo search
pub struct UnsplashProvider {
    http_client: HttpClient,
    access_key: String,
    api_base: String,
    per_page: u32,
    timeout: Duration,
}

impl UnsplashProvider {
    /// Create a new Unsplash provider
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MissingConfig` if the access key is empty.
    pub fn new(
        access_key: &str,
        api_base: impl Into<String>,
        per_page: u32,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if access_key.trim().is_empty() {
            return Err(ProviderError::MissingConfig(
                "UNSPLASH_ACCESS_KEY is missing".to_string(),
            ));
        }
        Ok(Self {
            http_client: create_http_client(timeout),
            access_key: access_key.to_string(),
            api_base: api_base.into(),
            per_page,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/search/photos", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: String,
    description: Option<String>,
    alt_description: Option<String>,
    links: PhotoLinks,
    user: Option<PhotoUser>,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    download: Option<String>,
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: Option<String>,
}

#[async_trait]
impl SearchProvider for UnsplashProvider {
    async fn search(&self, query: &str) -> Result<Vec<ImageRecord>, ProviderError> {
        let per_page = self.per_page.to_string();
        let auth = format!("Client-ID {}", self.access_key);
        let params = [("query", query), ("page", "1"), ("per_page", per_page.as_str())];
        let headers = [("Authorization", auth.as_str()), ("Accept-Version", "v1")];

        let response = get_json(
            &self.http_client,
            &self.endpoint(),
            &params,
            &headers,
            self.timeout,
        )
        .await?;

        let records = parse_search_response(response)?;
        debug!(count = records.len(), "Unsplash search returned");
        Ok(records)
    }
}

fn parse_search_response(response: Value) -> Result<Vec<ImageRecord>, ProviderError> {
    let parsed: SearchResponse =
        serde_json::from_value(response).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let records = parsed
        .results
        .into_iter()
        .filter_map(|photo| {
            let Some(reference) = photo.links.download else {
                warn!(photo_id = %photo.id, "Unsplash photo without download link skipped");
                return None;
            };
            Some(ImageRecord {
                reference,
                id: photo.id,
                description: photo.description.or(photo.alt_description),
                author: photo.user.and_then(|u| u.name),
                page_url: photo.links.html,
            })
        })
        .collect();

    Ok(records)
}
