//! Notification channels.
//!
//! Every alert is fanned out to all configured channels concurrently.
//! Each variant owns its wire format, auth scheme, and interpretation of
//! the remote response; a failing channel is logged and never affects the
//! others. Channels are constructed from configuration at (re)load time
//! and disposed before the next reload or at shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{error, warn};

use crate::domain::AlertMessage;

mod bark;
mod error;
mod http;
mod lark;
mod smtp;
mod telegram;
mod wecom;

pub use bark::BarkChannel;
pub use error::{ChannelConfigError, DeliveryError};
pub use http::HttpChannel;
pub use lark::LarkChannel;
pub use smtp::SmtpChannel;
pub use telegram::TelegramChannel;
pub use wecom::WeChatWorkChannel;

/// Uniform capability set over all channel variants.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable identity, e.g. `飞书推送 (open.feishu.cn)`.
    fn describe(&self) -> String;

    /// Deliver one alert.
    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError>;

    /// Release any held resources. Always safe to call, idempotent.
    async fn dispose(&self) {}
}

/// Tagged channel configuration, as it appears in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelConfig {
    Lark {
        webhook: String,
    },
    Telegram {
        #[serde(rename = "botToken")]
        bot_token: String,
        #[serde(rename = "chatId")]
        chat_id: String,
    },
    WeChatWork {
        webhook: String,
    },
    Bark {
        #[serde(rename = "deviceKey")]
        device_key: String,
        #[serde(default = "bark::default_server")]
        server: String,
    },
    #[serde(rename = "SMTP")]
    Smtp {
        host: String,
        #[serde(default = "smtp::default_port")]
        port: u16,
        username: String,
        password: String,
        from: Option<String>,
        to: String,
    },
    #[serde(rename = "HTTP")]
    Http {
        url: String,
    },
}

/// Construct one channel from its configuration.
pub fn build_channel(config: &ChannelConfig) -> Result<Arc<dyn Channel>, ChannelConfigError> {
    let channel: Arc<dyn Channel> = match config {
        ChannelConfig::Lark { webhook } => Arc::new(LarkChannel::new(webhook)?),
        ChannelConfig::Telegram { bot_token, chat_id } => {
            Arc::new(TelegramChannel::new(bot_token, chat_id)?)
        }
        ChannelConfig::WeChatWork { webhook } => Arc::new(WeChatWorkChannel::new(webhook)?),
        ChannelConfig::Bark { device_key, server } => {
            Arc::new(BarkChannel::new(device_key, server)?)
        }
        ChannelConfig::Smtp {
            host,
            port,
            username,
            password,
            from,
            to,
        } => Arc::new(SmtpChannel::new(
            host,
            *port,
            username,
            password,
            from.as_deref(),
            to,
        )?),
        ChannelConfig::Http { url } => Arc::new(HttpChannel::new(url)?),
    };
    Ok(channel)
}

/// Construct every configured channel, skipping ones that fail.
///
/// A channel missing a mandatory credential fails here, at configuration
/// time, and is omitted; the remaining channels still load.
pub fn build_channels(configs: &[ChannelConfig]) -> Vec<Arc<dyn Channel>> {
    let mut channels = Vec::new();
    for config in configs {
        match build_channel(config) {
            Ok(channel) => channels.push(channel),
            Err(e) => warn!(error = %e, "skipping notification channel"),
        }
    }
    channels
}

/// Deliver one alert to every channel concurrently.
///
/// Failures are logged per channel and otherwise swallowed; one slow or
/// failing channel never delays or fails the others.
pub async fn fan_out(channels: &[Arc<dyn Channel>], message: &AlertMessage) {
    let sends = channels.iter().map(|channel| {
        let channel = Arc::clone(channel);
        let message = message.clone();
        async move {
            if let Err(e) = channel.send(&message).await {
                error!(
                    channel = %channel.describe(),
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    });
    join_all(sends).await;
}

/// Dispose every channel.
pub async fn dispose_all(channels: &[Arc<dyn Channel>]) {
    join_all(channels.iter().map(|channel| channel.dispose())).await;
}

/// Shared HTTP client settings for webhook-style channels.
pub(crate) fn http_client() -> Result<reqwest::Client, ChannelConfigError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .map_err(|e| ChannelConfigError::Invalid {
            channel: "notification",
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Host portion of a webhook URL, for channel descriptions.
pub(crate) fn host_of(url: &str, channel: &'static str) -> Result<String, ChannelConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ChannelConfigError::Invalid {
        channel,
        message: format!("invalid URL {url:?}: {e}"),
    })?;
    Ok(parsed.host_str().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test double that records deliveries and can be told to fail.
    struct RecordingChannel {
        name: &'static str,
        fail: bool,
        delivered: Mutex<Vec<String>>,
        disposed: Mutex<bool>,
    }

    impl RecordingChannel {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                delivered: Mutex::new(Vec::new()),
                disposed: Mutex::new(false),
            })
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Status { status: 500 });
            }
            self.delivered.lock().unwrap().push(message.content.clone());
            Ok(())
        }

        async fn dispose(&self) {
            *self.disposed.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn fan_out_isolates_failures() {
        let first = RecordingChannel::new("first", false);
        let second = RecordingChannel::new("second", true);
        let third = RecordingChannel::new("third", false);
        let channels: Vec<Arc<dyn Channel>> =
            vec![first.clone(), second.clone(), third.clone()];

        let message = AlertMessage::with_time("2026-08-06 09:00:00", "G103 有票");
        fan_out(&channels, &message).await;

        assert_eq!(first.delivered.lock().unwrap().as_slice(), ["G103 有票"]);
        assert!(second.delivered.lock().unwrap().is_empty());
        assert_eq!(third.delivered.lock().unwrap().as_slice(), ["G103 有票"]);
    }

    #[tokio::test]
    async fn dispose_all_reaches_every_channel() {
        let first = RecordingChannel::new("first", false);
        let second = RecordingChannel::new("second", true);
        let channels: Vec<Arc<dyn Channel>> = vec![first.clone(), second.clone()];

        dispose_all(&channels).await;

        assert!(*first.disposed.lock().unwrap());
        assert!(*second.disposed.lock().unwrap());
    }

    #[test]
    fn build_channels_skips_broken_configs() {
        let configs = vec![
            ChannelConfig::Http {
                url: "https://example.com/hook".to_string(),
            },
            ChannelConfig::Lark {
                webhook: String::new(), // missing credential
            },
            ChannelConfig::Bark {
                device_key: "abc123".to_string(),
                server: "https://api.day.app".to_string(),
            },
        ];

        let channels = build_channels(&configs);
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn channel_config_deserializes_from_tagged_yaml() {
        let yaml = r#"
- type: Lark
  webhook: https://open.feishu.cn/open-apis/bot/v2/hook/abc
- type: Telegram
  botToken: "123:abc"
  chatId: "456"
- type: Bark
  deviceKey: dev
- type: SMTP
  host: smtp.example.com
  username: user@example.com
  password: secret
  to: target@example.com
- type: HTTP
  url: https://example.com/hook
"#;
        let configs: Vec<ChannelConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(configs.len(), 5);
        assert!(matches!(&configs[0], ChannelConfig::Lark { .. }));
        assert!(matches!(
            &configs[3],
            ChannelConfig::Smtp { port: 465, .. }
        ));
        match &configs[2] {
            ChannelConfig::Bark { server, .. } => assert_eq!(server, "https://api.day.app"),
            other => panic!("expected Bark, got {other:?}"),
        }
    }
}
