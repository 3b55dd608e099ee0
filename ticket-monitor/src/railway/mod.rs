//! Left-ticket API access.
//!
//! This module talks to the remote ticketing system's left-ticket query
//! endpoint and parses its train rows.
//!
//! Key characteristics of the endpoint:
//! - Each train is one `|`-delimited string; field positions are fixed
//!   by the upstream row layout
//! - Seat counts are strings: empty (not offered), `无` (sold out),
//!   `有` (available, count undisclosed), or a decimal count
//! - Queries are only answered for dates inside the bookable window
//!   (today to today+15)

mod client;
mod error;
pub(crate) mod record;

pub use client::{RetryPolicy, TicketClient, TicketClientConfig, TicketQueryData, TicketQueryResult};
pub(crate) use client::with_retry;
pub use error::RailwayError;
pub use record::TrainRecord;
