//! Telegram bot channel.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::AlertMessage;

use super::error::{ChannelConfigError, DeliveryError};
use super::{Channel, http_client};

const CHANNEL_NAME: &str = "Telegram推送";

/// Sends alerts through the Telegram bot API.
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    /// Create a channel. Fails when the bot token or chat id is missing.
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, ChannelConfigError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();

        if bot_token.is_empty() {
            return Err(ChannelConfigError::MissingField {
                channel: CHANNEL_NAME,
                field: "botToken",
            });
        }
        if chat_id.is_empty() {
            return Err(ChannelConfigError::MissingField {
                channel: CHANNEL_NAME,
                field: "chatId",
            });
        }

        Ok(Self {
            http: http_client()?,
            bot_token,
            chat_id,
        })
    }
}

fn format_text(message: &AlertMessage) -> String {
    format!(
        "🚄 *车票监控*\n\n🕒 *时间：* {}\n📝 *内容：* {}",
        message.time, message.content
    )
}

#[async_trait]
impl Channel for TelegramChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} (chat {})", self.chat_id)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": format_text(message),
            "parse_mode": "Markdown",
        });

        let response = self.http.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = body
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(DeliveryError::Rejected {
                detail: description.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_rejected() {
        assert!(matches!(
            TelegramChannel::new("", "456"),
            Err(ChannelConfigError::MissingField { field: "botToken", .. })
        ));
        assert!(matches!(
            TelegramChannel::new("123:abc", ""),
            Err(ChannelConfigError::MissingField { field: "chatId", .. })
        ));
    }

    #[test]
    fn describes_chat() {
        let channel = TelegramChannel::new("123:abc", "456").unwrap();
        assert_eq!(channel.describe(), "Telegram推送 (chat 456)");
    }

    #[test]
    fn markdown_template() {
        let message = AlertMessage::with_time("2026-08-06 09:00:00", "G103 有票");
        assert_eq!(
            format_text(&message),
            "🚄 *车票监控*\n\n🕒 *时间：* 2026-08-06 09:00:00\n📝 *内容：* G103 有票"
        );
    }
}
