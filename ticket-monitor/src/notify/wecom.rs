//! WeChat Work group-bot webhook channel.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::AlertMessage;

use super::error::{ChannelConfigError, DeliveryError};
use super::{Channel, host_of, http_client};

const CHANNEL_NAME: &str = "企业微信推送";

/// Sends alerts to a WeChat Work group-bot webhook.
pub struct WeChatWorkChannel {
    http: reqwest::Client,
    webhook: String,
    host: String,
}

impl WeChatWorkChannel {
    /// Create a channel. Fails when the webhook URL is missing or
    /// unparsable.
    pub fn new(webhook: impl Into<String>) -> Result<Self, ChannelConfigError> {
        let webhook = webhook.into();
        if webhook.is_empty() {
            return Err(ChannelConfigError::MissingField {
                channel: CHANNEL_NAME,
                field: "webhook",
            });
        }
        let host = host_of(&webhook, CHANNEL_NAME)?;

        Ok(Self {
            http: http_client()?,
            webhook,
            host,
        })
    }
}

fn format_text(message: &AlertMessage) -> String {
    format!(
        "[车票监控]\n🕒 时间：{}\n📝 内容：{}",
        message.time, message.content
    )
}

#[async_trait]
impl Channel for WeChatWorkChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} ({})", self.host)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let payload = json!({
            "msgtype": "text",
            "text": { "content": format_text(message) },
        });

        let response = self.http.post(&self.webhook).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let errcode = body.get("errcode").and_then(|v| v.as_i64()).unwrap_or(0);
        if errcode != 0 {
            let errmsg = body
                .get("errmsg")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(DeliveryError::Rejected {
                detail: format!("errcode {errcode}: {errmsg}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_webhook_rejected() {
        assert!(matches!(
            WeChatWorkChannel::new(""),
            Err(ChannelConfigError::MissingField { field: "webhook", .. })
        ));
    }

    #[test]
    fn describes_host() {
        let channel =
            WeChatWorkChannel::new("https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=abc")
                .unwrap();
        assert_eq!(channel.describe(), "企业微信推送 (qyapi.weixin.qq.com)");
    }
}
