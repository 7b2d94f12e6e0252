use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use client_core::ApiConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "company_admin.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub batch_delete: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            page_size: 10,
            timeout_secs: 30,
            batch_delete: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    api_key: Option<String>,
    page_size: Option<usize>,
    timeout_secs: Option<u64>,
    batch_delete: Option<bool>,
}

/// Defaults, then the TOML file at `path` (if present), then the environment.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| format!("invalid settings in '{}'", path.display()))
}

pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.api_url {
            settings.api_url = Some(v);
        }
        if let Some(v) = file_cfg.api_key {
            settings.api_key = Some(v);
        }
        if let Some(v) = file_cfg.page_size {
            settings.page_size = v;
        }
        if let Some(v) = file_cfg.timeout_secs.filter(|secs| *secs > 0) {
            settings.timeout_secs = v;
        }
        if let Some(v) = file_cfg.batch_delete {
            settings.batch_delete = v;
        }
    }

    if let Some(v) = env("U2V1_API_URL") {
        settings.api_url = Some(v);
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = Some(v);
    }

    if let Some(v) = env("U2V1_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = env("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.page_size = parsed;
        }
    }
    if let Some(v) = env("APP__TIMEOUT_SECS") {
        if let Some(parsed) = v.parse::<u64>().ok().filter(|secs| *secs > 0) {
            settings.timeout_secs = parsed;
        }
    }
    if let Some(v) = env("APP__BATCH_DELETE") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.batch_delete = parsed;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_url = self
            .api_url
            .as_deref()
            .context("company API url is not set (api_url, U2V1_API_URL or --api-url)")?;
        ensure!(self.timeout_secs > 0, "timeout_secs must be greater than zero");
        let mut config = ApiConfig::new(api_url)?
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_batch_delete(self.batch_delete);
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
