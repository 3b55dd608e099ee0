//! Core domain types.
//!
//! The types here represent validated ticket-monitoring data: station
//! telecodes, seat categories and raw counts, watch definitions, and alert
//! messages. Invariants are enforced at construction time, so code that
//! receives these types can trust their validity. Nothing here performs
//! I/O.

mod message;
mod seat;
mod telecode;
mod watch;

pub use message::AlertMessage;
pub use seat::{SeatCategory, SeatCount};
pub use telecode::{InvalidTelecode, Telecode};
pub use watch::{BOOKING_WINDOW_DAYS, TrainFilter, Watch, WatchError, in_booking_window};
