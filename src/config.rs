use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

use crate::core::DEFAULT_SLUG_MAX_LEN;

/// Default page size of the resolver's full-collection scan.
pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// Connection settings for both stores plus engine tunables.
///
/// Credentials stay server-side; `Debug` output redacts them.
#[derive(Clone)]
pub struct SyncConfig {
    /// Base URL of the content store API
    pub content_base_url: String,

    /// Bearer token for the content store
    pub content_token: String,

    /// Base URL of the catalog store API
    pub catalog_base_url: String,

    /// Bearer token for the catalog store
    pub catalog_token: String,

    /// Per-request timeout applied by the HTTP transport
    pub request_timeout: Duration,

    /// Maximum number of records fetched by a resolver scan
    pub scan_limit: usize,

    /// Maximum slug length
    pub slug_max_len: usize,
}

impl SyncConfig {
    /// Create a configuration for the given store endpoints with default tunables
    pub fn new(content_base_url: &str, catalog_base_url: &str) -> Self {
        Self {
            content_base_url: trim_base(content_base_url),
            content_token: String::new(),
            catalog_base_url: trim_base(catalog_base_url),
            catalog_token: String::new(),
            request_timeout: Duration::from_secs(30),
            scan_limit: DEFAULT_SCAN_LIMIT,
            slug_max_len: DEFAULT_SLUG_MAX_LEN,
        }
    }

    /// Set the content store token
    pub fn content_token(mut self, token: &str) -> Self {
        self.content_token = token.to_string();
        self
    }

    /// Set the catalog store token
    pub fn catalog_token(mut self, token: &str) -> Self {
        self.catalog_token = token.to_string();
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the resolver scan limit
    pub fn scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit.max(1);
        self
    }

    /// Set the maximum slug length
    pub fn slug_max_len(mut self, len: usize) -> Self {
        self.slug_max_len = len.max(1);
        self
    }

    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let content_base_url = env::var("STORESYNC_CONTENT_URL")
            .context("STORESYNC_CONTENT_URL must be set")?;
        let catalog_base_url = env::var("STORESYNC_CATALOG_URL")
            .context("STORESYNC_CATALOG_URL must be set")?;

        let timeout_secs = env::var("STORESYNC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("STORESYNC_TIMEOUT_SECS must be a valid u64")?;

        let scan_limit = env::var("STORESYNC_SCAN_LIMIT")
            .unwrap_or_else(|_| DEFAULT_SCAN_LIMIT.to_string())
            .parse::<usize>()
            .context("STORESYNC_SCAN_LIMIT must be a valid usize")?;

        let slug_max_len = Self::slug_max_len_from_env()?;

        Ok(Self::new(&content_base_url, &catalog_base_url)
            .content_token(&env::var("STORESYNC_CONTENT_TOKEN").unwrap_or_default())
            .catalog_token(&env::var("STORESYNC_CATALOG_TOKEN").unwrap_or_default())
            .request_timeout(Duration::from_secs(timeout_secs))
            .scan_limit(scan_limit)
            .slug_max_len(slug_max_len))
    }

    /// Slug length limit from `STORESYNC_SLUG_MAX_LEN`, without requiring
    /// the store endpoints to be configured.
    pub fn slug_max_len_from_env() -> Result<usize> {
        dotenvy::dotenv().ok();
        parse_slug_max_len(env::var("STORESYNC_SLUG_MAX_LEN").ok())
    }
}

fn parse_slug_max_len(value: Option<String>) -> Result<usize> {
    let len = match value {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .context("STORESYNC_SLUG_MAX_LEN must be a valid usize")?,
        None => DEFAULT_SLUG_MAX_LEN,
    };
    Ok(len.max(1))
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://localhost:1337/api", "http://localhost:8080/wp-json/wc/v3")
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("content_base_url", &self.content_base_url)
            .field("content_token", &redacted(&self.content_token))
            .field("catalog_base_url", &self.catalog_base_url)
            .field("catalog_token", &redacted(&self.catalog_token))
            .field("request_timeout", &self.request_timeout)
            .field("scan_limit", &self.scan_limit)
            .field("slug_max_len", &self.slug_max_len)
            .finish()
    }
}

fn redacted(token: &str) -> &'static str {
    if token.is_empty() { "<unset>" } else { "<redacted>" }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
