//! Left-ticket API error types.

use chrono::NaiveDate;

/// Errors from the left-ticket client and row parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RailwayError {
    /// Transport or HTTP failure that survived every retry.
    #[error("network request failed after {attempts} attempts: {detail}")]
    Network { attempts: u32, detail: String },

    /// The payload decoded but was malformed or flagged unsuccessful.
    #[error("left-ticket data unavailable: {0}")]
    RemoteData(String),

    /// The travel date is outside the bookable window.
    #[error("travel date {date} is outside the bookable window ({today} to +15 days)")]
    DateRange { date: NaiveDate, today: NaiveDate },

    /// A train row did not match the expected field layout.
    #[error("malformed train row: {0}")]
    MalformedRecord(String),
}
