//! Watch definitions: one monitored route + date + filter set.

use chrono::{Days, NaiveDate};
use serde::Deserialize;

use super::seat::SeatCategory;

/// Tickets can be booked from today up to this many days ahead.
pub const BOOKING_WINDOW_DAYS: u64 = 15;

/// Error produced when validating a watch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The travel date is not `YYYYMMDD`.
    #[error("invalid travel date {0:?}: expected YYYYMMDD")]
    InvalidDate(String),

    /// A required field is empty.
    #[error("watch is missing {0}")]
    MissingField(&'static str),

    /// A train filter has no train code.
    #[error("train filter is missing a train code")]
    MissingTrainCode,
}

/// One monitored route + date, with optional per-train filters.
///
/// `from` and `to` are station display names; they are resolved to
/// telecodes against the station directory before querying. A watch with
/// no filters evaluates every train returned for the route.
#[derive(Debug, Clone, Deserialize)]
pub struct Watch {
    /// Travel date in `YYYYMMDD` form.
    pub date: String,

    /// Origin station display name.
    pub from: String,

    /// Destination station display name.
    pub to: String,

    /// Filters selecting which trains to evaluate, in order.
    #[serde(default)]
    pub trains: Vec<TrainFilter>,
}

impl Watch {
    /// Validate required fields and the date format.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.date.is_empty() {
            return Err(WatchError::MissingField("date"));
        }
        if self.from.is_empty() {
            return Err(WatchError::MissingField("from"));
        }
        if self.to.is_empty() {
            return Err(WatchError::MissingField("to"));
        }
        self.travel_date()?;
        for filter in &self.trains {
            filter.validate()?;
        }
        Ok(())
    }

    /// Parse the travel date.
    pub fn travel_date(&self) -> Result<NaiveDate, WatchError> {
        NaiveDate::parse_from_str(&self.date, "%Y%m%d")
            .map_err(|_| WatchError::InvalidDate(self.date.clone()))
    }
}

/// Filter selecting one train, optionally restricted by calling points
/// and seat categories.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainFilter {
    /// Train code, e.g. `G103`.
    #[serde(default)]
    pub code: String,

    /// Only match when the queried segment starts at this station name.
    pub from: Option<String>,

    /// Only match when the queried segment ends at this station name.
    pub to: Option<String>,

    /// Seat categories to consider. Absent means all categories.
    #[serde(rename = "seatCategory")]
    pub seat_category: Option<Vec<SeatCategory>>,

    /// Whether to query the train's full route when the segment is sold
    /// out.
    #[serde(rename = "checkRoundTrip", default)]
    pub check_round_trip: bool,
}

impl TrainFilter {
    /// Validate that the filter names a train.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.code.is_empty() {
            return Err(WatchError::MissingTrainCode);
        }
        Ok(())
    }

    /// Whether this filter applies to a train, given the resolved display
    /// names of the queried segment's endpoints.
    ///
    /// `None` endpoint names (telecode not in the directory) only match
    /// filters without the corresponding restriction.
    pub fn matches(&self, train_code: &str, from_name: Option<&str>, to_name: Option<&str>) -> bool {
        if self.code != train_code {
            return false;
        }
        if let Some(want) = &self.from
            && from_name != Some(want.as_str())
        {
            return false;
        }
        if let Some(want) = &self.to
            && to_name != Some(want.as_str())
        {
            return false;
        }
        true
    }
}

/// Whether a travel date is inside the bookable window
/// [`today`, `today + BOOKING_WINDOW_DAYS`].
pub fn in_booking_window(date: NaiveDate, today: NaiveDate) -> bool {
    let limit = today.checked_add_days(Days::new(BOOKING_WINDOW_DAYS));
    date >= today && limit.is_some_and(|limit| date <= limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(date: &str, from: &str, to: &str) -> Watch {
        Watch {
            date: date.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            trains: Vec::new(),
        }
    }

    #[test]
    fn valid_watch() {
        assert!(watch("20260815", "北京", "上海").validate().is_ok());
    }

    #[test]
    fn missing_fields_rejected() {
        assert_eq!(
            watch("", "北京", "上海").validate(),
            Err(WatchError::MissingField("date"))
        );
        assert_eq!(
            watch("20260815", "", "上海").validate(),
            Err(WatchError::MissingField("from"))
        );
        assert_eq!(
            watch("20260815", "北京", "").validate(),
            Err(WatchError::MissingField("to"))
        );
    }

    #[test]
    fn bad_date_rejected() {
        assert!(matches!(
            watch("2026-08-15", "北京", "上海").validate(),
            Err(WatchError::InvalidDate(_))
        ));
        assert!(matches!(
            watch("tomorrow", "北京", "上海").validate(),
            Err(WatchError::InvalidDate(_))
        ));
    }

    #[test]
    fn filter_without_code_rejected() {
        let mut w = watch("20260815", "北京", "上海");
        w.trains.push(TrainFilter {
            code: String::new(),
            from: None,
            to: None,
            seat_category: None,
            check_round_trip: false,
        });
        assert_eq!(w.validate(), Err(WatchError::MissingTrainCode));
    }

    #[test]
    fn booking_window() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        assert!(in_booking_window(today, today));
        assert!(in_booking_window(
            NaiveDate::from_ymd_opt(2026, 8, 21).unwrap(),
            today
        ));
        assert!(!in_booking_window(
            NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(),
            today
        ));
        assert!(!in_booking_window(
            NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            today
        ));
    }

    #[test]
    fn filter_matching() {
        let filter = TrainFilter {
            code: "G103".to_string(),
            from: Some("北京南".to_string()),
            to: None,
            seat_category: None,
            check_round_trip: false,
        };

        assert!(filter.matches("G103", Some("北京南"), Some("上海虹桥")));
        assert!(!filter.matches("G104", Some("北京南"), Some("上海虹桥")));
        assert!(!filter.matches("G103", Some("天津南"), Some("上海虹桥")));
        // Unresolvable endpoint name never satisfies a restriction
        assert!(!filter.matches("G103", None, Some("上海虹桥")));
    }

    #[test]
    fn unrestricted_filter_matches_any_endpoints() {
        let filter = TrainFilter {
            code: "D6".to_string(),
            from: None,
            to: None,
            seat_category: None,
            check_round_trip: false,
        };

        assert!(filter.matches("D6", None, None));
        assert!(filter.matches("D6", Some("北京"), Some("沈阳")));
    }

    #[test]
    fn deserialize_config_shape() {
        let yaml = r#"
date: "20260815"
from: 北京
to: 上海
trains:
  - code: G103
    seatCategory: [二等座, 一等座]
    checkRoundTrip: true
"#;
        let w: Watch = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(w.date, "20260815");
        assert_eq!(w.trains.len(), 1);
        let filter = &w.trains[0];
        assert_eq!(filter.code, "G103");
        assert_eq!(
            filter.seat_category,
            Some(vec![SeatCategory::SecondClass, SeatCategory::FirstClass])
        );
        assert!(filter.check_round_trip);
    }
}
