//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! provider constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Core settings shared by every transport.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImgbotSettings {
    /// Unsplash API access key
    pub unsplash_access_key: Option<String>,
    /// Unsplash API base URL
    #[serde(default = "default_unsplash_api_base")]
    pub unsplash_api_base: String,
    /// Results requested from Unsplash per search
    #[serde(default = "default_unsplash_per_page")]
    pub unsplash_per_page: u32,

    /// Translation endpoint base URL
    #[serde(default = "default_translate_api_base")]
    pub translate_api_base: String,
    /// Language queries are normalized to before searching
    #[serde(default = "default_translate_target_lang")]
    pub translate_target_lang: String,

    /// Images delivered per request until a chat configures its own value
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    /// R2 Storage access key ID
    pub r2_access_key_id: Option<String>,
    /// R2 Storage secret access key
    pub r2_secret_access_key: Option<String>,
    /// R2 Storage endpoint URL
    pub r2_endpoint_url: Option<String>,
    /// R2 Storage bucket name
    pub r2_bucket_name: Option<String>,
}

impl Default for ImgbotSettings {
    fn default() -> Self {
        Self {
            unsplash_access_key: None,
            unsplash_api_base: default_unsplash_api_base(),
            unsplash_per_page: default_unsplash_per_page(),
            translate_api_base: default_translate_api_base(),
            translate_target_lang: default_translate_target_lang(),
            default_batch_size: default_batch_size(),
            r2_access_key_id: None,
            r2_secret_access_key: None,
            r2_endpoint_url: None,
            r2_bucket_name: None,
        }
    }
}

fn default_unsplash_api_base() -> String {
    UNSPLASH_API_BASE.to_string()
}

const fn default_unsplash_per_page() -> u32 {
    UNSPLASH_DEFAULT_PER_PAGE
}

fn default_translate_api_base() -> String {
    TRANSLATE_API_BASE.to_string()
}

fn default_translate_target_lang() -> String {
    "en".to_string()
}

const fn default_batch_size() -> usize {
    1
}

/// Build the layered configuration source used by every settings struct.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // `APP__UNSPLASH_PER_PAGE=30` sets `unsplash_per_page`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl ImgbotSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // Fallback for env vars the automatic mapping did not pick up
        fill_from_env(&mut settings.unsplash_access_key, "UNSPLASH_ACCESS_KEY");
        fill_from_env(&mut settings.r2_endpoint_url, "R2_ENDPOINT_URL");
        fill_from_env(&mut settings.r2_access_key_id, "R2_ACCESS_KEY_ID");
        fill_from_env(&mut settings.r2_secret_access_key, "R2_SECRET_ACCESS_KEY");
        fill_from_env(&mut settings.r2_bucket_name, "R2_BUCKET_NAME");

        Ok(settings)
    }

    /// Per-page value sent to Unsplash, clamped to the API limits.
    #[must_use]
    pub fn unsplash_per_page(&self) -> u32 {
        self.unsplash_per_page.clamp(1, UNSPLASH_MAX_PER_PAGE)
    }

    /// Default batch size; zero in config falls back to one.
    #[must_use]
    pub fn default_batch_size(&self) -> usize {
        self.default_batch_size.max(1)
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.is_some() {
        return;
    }
    if let Ok(val) = std::env::var(var) {
        if !val.is_empty() {
            *slot = Some(val);
        }
    }
}

/// Default Unsplash API base URL
pub const UNSPLASH_API_BASE: &str = "https://api.unsplash.com";
/// Default number of results requested per search
pub const UNSPLASH_DEFAULT_PER_PAGE: u32 = 10;
/// Upper bound Unsplash accepts for `per_page`
pub const UNSPLASH_MAX_PER_PAGE: u32 = 30;
/// Default translation endpoint base URL
pub const TRANSLATE_API_BASE: &str = "https://translate.googleapis.com";

/// Default timeout (seconds) for every outbound call
pub const OUTBOUND_TIMEOUT_SECS: u64 = 10;

/// Get outbound call timeout from env or default.
///
/// Environment variable: `OUTBOUND_TIMEOUT_SECS`.
#[must_use]
pub fn get_outbound_timeout_secs() -> u64 {
    std::env::var("OUTBOUND_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(OUTBOUND_TIMEOUT_SECS)
}

/// Outbound call timeout as a `Duration`.
#[must_use]
pub fn outbound_timeout() -> Duration {
    Duration::from_secs(get_outbound_timeout_secs())
}
