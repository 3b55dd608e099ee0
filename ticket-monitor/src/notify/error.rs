//! Notification channel error types.

/// A channel could not be constructed from its configuration.
///
/// Raised at config (re)load time, never at send time; the offending
/// channel is skipped and the others still load.
#[derive(Debug, thiserror::Error)]
pub enum ChannelConfigError {
    /// A mandatory credential or field is absent or empty
    #[error("{channel} configuration is missing {field}")]
    MissingField {
        channel: &'static str,
        field: &'static str,
    },

    /// A field is present but unusable
    #[error("{channel} configuration invalid: {message}")]
    Invalid {
        channel: &'static str,
        message: String,
    },
}

/// A delivery attempt failed.
///
/// Logged per channel; never propagated to other channels or the poll
/// cycle.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with an error status
    #[error("delivery rejected: HTTP {status}")]
    Status { status: u16 },

    /// The remote answered 2xx but reported failure in its body
    #[error("remote rejected message: {detail}")]
    Rejected { detail: String },

    /// SMTP submission failed
    #[error("SMTP error: {0}")]
    Smtp(String),
}
