//! Bark push channel (iOS push via a Bark server).

use async_trait::async_trait;
use serde_json::json;

use crate::domain::AlertMessage;

use super::error::{ChannelConfigError, DeliveryError};
use super::{Channel, host_of, http_client};

const CHANNEL_NAME: &str = "Bark推送";

/// Default public Bark server.
pub(crate) fn default_server() -> String {
    "https://api.day.app".to_string()
}

/// Sends alerts to a Bark server.
pub struct BarkChannel {
    http: reqwest::Client,
    server: String,
    device_key: String,
    host: String,
}

impl BarkChannel {
    /// Create a channel. Fails when the device key is missing or the
    /// server URL is unparsable.
    pub fn new(
        device_key: impl Into<String>,
        server: impl Into<String>,
    ) -> Result<Self, ChannelConfigError> {
        let device_key = device_key.into();
        let server = server.into();

        if device_key.is_empty() {
            return Err(ChannelConfigError::MissingField {
                channel: CHANNEL_NAME,
                field: "deviceKey",
            });
        }
        let server = if server.is_empty() {
            default_server()
        } else {
            server
        };
        let host = host_of(&server, CHANNEL_NAME)?;

        Ok(Self {
            http: http_client()?,
            server: server.trim_end_matches('/').to_string(),
            device_key,
            host,
        })
    }
}

#[async_trait]
impl Channel for BarkChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} ({})", self.host)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let url = format!("{}/push", self.server);
        let payload = json!({
            "title": "车票监控",
            "body": format!("🕒 时间：{}\n📝 内容：{}", message.time, message.content),
            "device_key": self.device_key,
        });

        let response = self.http.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let code = body.get("code").and_then(|v| v.as_i64()).unwrap_or(200);
        if code != 200 {
            let msg = body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(DeliveryError::Rejected {
                detail: format!("code {code}: {msg}"),
            });
        }

        Ok(())
    }
}
