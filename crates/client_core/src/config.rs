use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the company API, built once at startup and handed
/// to [`crate::CompanyApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Use the bulk delete endpoint when several ids are removed at once.
    pub batch_delete: bool,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow!("company API base url is not configured"));
        }
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base url '{base_url}' cannot carry a path"));
        }

        Ok(Self {
            base_url,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            batch_delete: false,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_delete(mut self, batch_delete: bool) -> Self {
        self.batch_delete = batch_delete;
        self
    }

    /// Appends `segments` to the base url path, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("API base url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
