//! Generic HTTP POST channel.
//!
//! Posts the alert as JSON (`{"time": …, "content": …}`) to a
//! caller-supplied URL. Any 2xx status counts as delivered.

use async_trait::async_trait;

use crate::domain::AlertMessage;

use super::error::{ChannelConfigError, DeliveryError};
use super::{Channel, host_of, http_client};

const CHANNEL_NAME: &str = "HTTP 推送";

/// Sends alerts as raw JSON to an arbitrary endpoint.
pub struct HttpChannel {
    http: reqwest::Client,
    url: String,
    host: String,
}

impl HttpChannel {
    /// Create a channel. Fails when the URL is missing or unparsable.
    pub fn new(url: impl Into<String>) -> Result<Self, ChannelConfigError> {
        let url = url.into();
        if url.is_empty() {
            return Err(ChannelConfigError::MissingField {
                channel: CHANNEL_NAME,
                field: "url",
            });
        }
        let host = host_of(&url, CHANNEL_NAME)?;

        Ok(Self {
            http: http_client()?,
            url,
            host,
        })
    }
}

#[async_trait]
impl Channel for HttpChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} ({})", self.host)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let response = self.http.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
