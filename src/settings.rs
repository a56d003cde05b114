use std::time::Duration;

use config::{Config, Environment, File};

use crate::crawler::CrawlerOptions;
use crate::error::Error;
use crate::sink::DatasetOptions;
use crate::spiders::notes::NotesSearchOptions;

pub const CONFIG_PATH_VAR: &str = "FETCH_XHS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "fetch-xhs.toml";
const ENV_PREFIX: &str = "FETCH_XHS";

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crawler: CrawlerSettings,
    pub spider: NotesSearchOptions,
    pub dataset: DatasetOptions,
    pub user_agent: Option<String>,
    pub log_json: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct CrawlerSettings {
    pub min_concurrency: usize,
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub max_requests_per_run: usize,
    /// Fixed wait before each retry.
    pub retry_delay_ms: u64,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            min_concurrency: 10,
            max_concurrency: 50,
            max_retries: 1,
            request_timeout_secs: 30,
            max_requests_per_run: 10,
            retry_delay_ms: 0,
        }
    }
}

impl TryFrom<&CrawlerSettings> for CrawlerOptions {
    type Error = Error;

    fn try_from(settings: &CrawlerSettings) -> Result<Self, Self::Error> {
        let retry_delay = Duration::from_millis(settings.retry_delay_ms);
        let options = CrawlerOptions {
            min_concurrency: settings.min_concurrency,
            max_concurrency: settings.max_concurrency,
            max_retries: settings.max_retries,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_requests_per_run: settings.max_requests_per_run,
            ..Default::default()
        }
        .with_retry_delay(move |_| retry_delay);
        options.validate()?;
        Ok(options)
    }
}

impl Settings {
    /// Reads the file named by `FETCH_XHS_CONFIG` (if present), then
    /// `FETCH_XHS__*` environment variables on top.
    pub fn load() -> Result<Self, Error> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_sources(File::with_name(&path).required(false))
    }

    fn from_sources<S>(file: S) -> Result<Self, Error>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn crawler_options(&self) -> Result<CrawlerOptions, Error> {
        CrawlerOptions::try_from(&self.crawler)
    }
}
