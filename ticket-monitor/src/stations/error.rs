//! Station directory error types.

/// Errors that can occur when fetching or parsing the station list.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Transport or HTTP failure that survived every retry
    #[error("station list request failed after {attempts} attempts: {detail}")]
    Network { attempts: u32, detail: String },

    /// The payload did not contain a recognizable station list
    #[error("station list parse error: {message}")]
    Parse { message: String },
}
