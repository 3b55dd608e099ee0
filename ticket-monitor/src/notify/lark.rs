//! Lark (Feishu) group-bot webhook channel.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::AlertMessage;

use super::error::{ChannelConfigError, DeliveryError};
use super::{Channel, host_of, http_client};

const CHANNEL_NAME: &str = "飞书推送";

/// Sends alerts to a Lark group-bot webhook.
pub struct LarkChannel {
    http: reqwest::Client,
    webhook: String,
    host: String,
}

impl LarkChannel {
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

/// Message body in the bot's text template.
fn format_text(message: &AlertMessage) -> String {
    format!(
        "[车票监控]\n🕒 时间：{}\n📝 内容：{}",
        message.time, message.content
    )
}

#[async_trait]
impl Channel for LarkChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} ({})", self.host)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let payload = json!({
            "msg_type": "text",
            "content": { "text": format_text(message) },
        });

        let response = self.http.post(&self.webhook).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        // The bot endpoint answers 200 even for rejected messages; the
        // structured code is authoritative.
        let body: serde_json::Value = response.json().await?;
        let code = body
            .get("code")
            .or_else(|| body.get("StatusCode"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        if code != 0 {
            let msg = body
                .get("msg")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(DeliveryError::Rejected {
                detail: format!("code {code}: {msg}"),
            });
        }

        Ok(())
    }
}
