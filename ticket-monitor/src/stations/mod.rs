//! Station directory: display name ↔ telecode resolution.
//!
//! The ticketing system identifies stations by telecode on the wire but
//! users configure watches with display names. The directory is fetched
//! once at startup and held in memory.

mod client;
mod directory;
mod error;

pub use client::{StationClient, StationClientConfig, StationEntry};
pub use directory::StationDirectory;
pub use error::StationError;
