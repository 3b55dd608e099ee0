//! Availability evaluation.
//!
//! Decides, for one parsed train, whether an alert should fire and what
//! the alert should say. The seat check itself is pure; the full-route
//! fallback issues one extra (cached) query when the requested segment is
//! sold out.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;

use crate::cache::CachedTicketClient;
use crate::domain::{SeatCategory, SeatCount};
use crate::railway::{RailwayError, TrainRecord};

/// Running total of sellable seats across categories.
///
/// `有` discloses no count and makes the total unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatTotal {
    Bounded(u32),
    Unbounded,
}

impl SeatTotal {
    fn add(self, count: &SeatCount) -> Self {
        match (self, count) {
            (_, SeatCount::Available) => SeatTotal::Unbounded,
            (SeatTotal::Unbounded, _) => SeatTotal::Unbounded,
            (SeatTotal::Bounded(n), SeatCount::Seats(m)) => {
                SeatTotal::Bounded(n.saturating_add(*m))
            }
            // Raw values carry no usable count
            (SeatTotal::Bounded(n), _) => SeatTotal::Bounded(n),
        }
    }
}

impl fmt::Display for SeatTotal {
    /// Estimates at or above 20 are collapsed to `≥20`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatTotal::Bounded(n) if *n < 20 => write!(f, "{n}"),
            _ => f.write_str("≥20"),
        }
    }
}

/// Result of the pure seat check.
#[derive(Debug, Clone)]
pub struct SeatCheck {
    /// Categories with sellable seats, with their raw values.
    pub present: Vec<(SeatCategory, SeatCount)>,

    /// Estimated total across the present categories.
    pub total: SeatTotal,
}

impl SeatCheck {
    /// Whether any considered category has sellable seats.
    pub fn has_availability(&self) -> bool {
        !self.present.is_empty()
    }

    /// Present categories joined as `label value` pairs.
    pub fn summary(&self) -> String {
        self.present
            .iter()
            .map(|(category, count)| format!("{} {count}", category.label()))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Check a record's seat fields against an optional category filter.
///
/// Filtering is exact: a filter that excludes the only category with
/// seats yields no availability. Pure: identical inputs always yield
/// identical output.
pub fn check_seats(record: &TrainRecord, filter: Option<&[SeatCategory]>) -> SeatCheck {
    let mut present = Vec::new();
    let mut total = SeatTotal::Bounded(0);

    for (category, count) in record.seats() {
        if let Some(wanted) = filter
            && !wanted.contains(&category)
        {
            continue;
        }
        if !count.is_sellable() {
            continue;
        }
        total = total.add(count);
        present.push((category, count.clone()));
    }

    SeatCheck { present, total }
}

/// Outcome of evaluating one train for one filter.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Whether the requested segment has sellable seats.
    pub has_availability: bool,

    /// Human-readable seat summary.
    pub summary: String,

    /// Estimated seat total for the requested segment.
    pub total: SeatTotal,
}

/// Evaluate one train.
///
/// When the segment is sold out and `check_round_trip` is set, a second
/// query for the train's full route annotates the summary with whether
/// the full route still has seats; the segment itself is still reported
/// as unavailable. `fetch_delay` is applied to the fallback query when it
/// misses the cache.
pub async fn evaluate(
    client: &CachedTicketClient,
    record: &TrainRecord,
    seat_filter: Option<&[SeatCategory]>,
    check_round_trip: bool,
    fetch_delay: Option<Duration>,
) -> Result<Evaluation, RailwayError> {
    let check = check_seats(record, seat_filter);

    if check.has_availability() {
        return Ok(Evaluation {
            has_availability: true,
            summary: check.summary(),
            total: check.total,
        });
    }

    if !check_round_trip {
        return Ok(Evaluation {
            has_availability: false,
            summary: "区间无票".to_string(),
            total: SeatTotal::Bounded(0),
        });
    }

    let date = NaiveDate::parse_from_str(&record.start_train_date, "%Y%m%d").map_err(|_| {
        RailwayError::MalformedRecord(format!(
            "start train date {:?}: expected YYYYMMDD",
            record.start_train_date
        ))
    })?;

    let result = client
        .fetch_availability(date, record.start_telecode, record.end_telecode, fetch_delay)
        .await?;

    let full_route: Vec<TrainRecord> = result
        .data
        .result
        .iter()
        .filter_map(|row| TrainRecord::parse(row).ok())
        .collect();

    let summary = match find_full_route(&full_route, record) {
        Some(full) => {
            // The full route is evaluated with no seat filter: any class
            // counts once the requested segment is gone.
            let full_check = check_seats(full, None);
            if full_check.has_availability() {
                format!("区间无票，全程有票 ({}张)", full_check.total)
            } else {
                "区间无票，全程无票".to_string()
            }
        }
        None => "区间无票，全程未知".to_string(),
    };

    Ok(Evaluation {
        has_availability: false,
        summary,
        total: SeatTotal::Bounded(0),
    })
}

/// Find the record covering `segment`'s train over its full route.
fn find_full_route<'a>(
    records: &'a [TrainRecord],
    segment: &TrainRecord,
) -> Option<&'a TrainRecord> {
    records.iter().find(|record| {
        record.train_code == segment.train_code
            && record.from_telecode == segment.start_telecode
            && record.to_telecode == segment.end_telecode
    })
}
