//! Configuration loading and validation.
//!
//! The config file is YAML: a list of watches, a list of tagged channel
//! configurations, the polling interval in minutes and the inter-request
//! delay in seconds. Validation failures here are fatal at startup; the
//! monitor never runs with an empty or incomplete watch list.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Watch, WatchError};
use crate::notify::ChannelConfig;

/// Fallback polling interval in minutes.
const DEFAULT_INTERVAL_MINS: u64 = 15;

/// Fallback inter-request delay in seconds.
const DEFAULT_DELAY_SECS: u64 = 5;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for the expected shape
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The watch list is empty
    #[error("no watches configured")]
    NoWatches,

    /// A watch failed validation
    #[error("watch {index}: {source}")]
    Watch {
        index: usize,
        #[source]
        source: WatchError,
    },
}

/// Validated monitor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Routes and dates to monitor.
    #[serde(default)]
    pub watch: Vec<Watch>,

    /// Notification channel configurations.
    #[serde(default)]
    pub notifications: Vec<ChannelConfig>,

    /// Polling interval in minutes.
    #[serde(default)]
    pub interval: u64,

    /// Delay before each uncached upstream request, in seconds.
    #[serde(default)]
    pub delay: u64,
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate config from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(contents)?;

        // Zero means unset, as does absence.
        if config.interval == 0 {
            config.interval = DEFAULT_INTERVAL_MINS;
        }
        if config.delay == 0 {
            config.delay = DEFAULT_DELAY_SECS;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the watch list.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.is_empty() {
            return Err(ConfigError::NoWatches);
        }
        for (index, watch) in self.watch.iter().enumerate() {
            watch
                .validate()
                .map_err(|source| ConfigError::Watch { index, source })?;
        }
        Ok(())
    }

    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval * 60)
    }

    /// Inter-request delay as a duration.
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Human-readable configuration echo, sent as the first alert so
    /// users can verify their push setup end to end.
    pub fn summary(&self, channel_descriptions: &[String]) -> String {
        let mut out = String::from("当前配置文件：\n\n");

        for watch in &self.watch {
            out.push_str(&format!("{} {}→{}\n", watch.date, watch.from, watch.to));
            if watch.trains.is_empty() {
                out.push_str("- 全部车次\n");
            } else {
                for filter in &watch.trains {
                    let categories = match &filter.seat_category {
                        Some(categories) => categories
                            .iter()
                            .map(|c| c.label())
                            .collect::<Vec<_>>()
                            .join("/"),
                        None => "全部席别".to_string(),
                    };
                    out.push_str(&format!(
                        "- {} {}→{} {} {}查询全程票\n",
                        filter.code,
                        filter.from.as_deref().unwrap_or("(*)"),
                        filter.to.as_deref().unwrap_or("(*)"),
                        categories,
                        if filter.check_round_trip { "[✓]" } else { "[×]" },
                    ));
                }
            }
            out.push('\n');
        }

        if channel_descriptions.is_empty() {
            out.push_str("未配置消息推送\n");
        } else {
            for description in channel_descriptions {
                out.push_str(&format!("已配置消息推送：{description}\n"));
            }
        }
        out.push('\n');

        out.push_str(&format!(
            "查询间隔：{}分钟，访问延迟：{}秒",
            self.interval, self.delay
        ));
        out
    }
}
