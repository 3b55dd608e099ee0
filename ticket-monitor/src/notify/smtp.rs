//! SMTP email channel.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::AlertMessage;

use super::Channel;
use super::error::{ChannelConfigError, DeliveryError};

const CHANNEL_NAME: &str = "SMTP邮件推送";

/// Default SMTP submission port (implicit TLS).
pub(crate) fn default_port() -> u16 {
    465
}

/// Sends alerts as plain-text email over authenticated SMTP.
pub struct SmtpChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    host: String,
}

impl SmtpChannel {
    /// Create a channel.
    ///
    /// Fails when host, username, password, or recipient is missing, or
    /// when an address does not parse. The sender defaults to the
    /// username when `from` is not given.
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<Self, ChannelConfigError> {
        let missing = |field| ChannelConfigError::MissingField {
            channel: CHANNEL_NAME,
            field,
        };
        if host.is_empty() {
            return Err(missing("host"));
        }
        if username.is_empty() {
            return Err(missing("username"));
        }
        if password.is_empty() {
            return Err(missing("password"));
        }
        if to.is_empty() {
            return Err(missing("to"));
        }

        let parse_mailbox = |addr: &str, field: &str| {
            addr.parse::<Mailbox>()
                .map_err(|e| ChannelConfigError::Invalid {
                    channel: CHANNEL_NAME,
                    message: format!("{field} address {addr:?}: {e}"),
                })
        };
        let from = parse_mailbox(from.unwrap_or(username), "from")?;
        let to = parse_mailbox(to, "to")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| ChannelConfigError::Invalid {
                channel: CHANNEL_NAME,
                message: format!("SMTP relay {host:?}: {e}"),
            })?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
            host: host.to_string(),
        })
    }
}

#[async_trait]
impl Channel for SmtpChannel {
    fn describe(&self) -> String {
        format!("{CHANNEL_NAME} ({})", self.host)
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject("车票监控提醒")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "🕒 时间：{}\n\n📝 内容：{}",
                message.time, message.content
            ))
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        Ok(())
    }

    // dispose: default no-op. Connections are opened per send and closed
    // by the transport when the message is submitted.
}
