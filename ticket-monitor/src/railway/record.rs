//! Train row parsing.
//!
//! The left-ticket endpoint returns each train as one `|`-delimited
//! string. Field positions follow the upstream `queryLeftTicket` row
//! layout; only the fields this crate consumes are named, the rest are
//! ignored at parse time.

use crate::domain::{SeatCategory, SeatCount, Telecode};

use super::error::RailwayError;

/// Minimum number of `|`-separated fields in a well-formed row.
const ROW_FIELDS: usize = 56;

/// Positions of the per-category seat-count fields, in
/// [`SeatCategory::ALL`] order.
const SEAT_FIELD_BASE: usize = 20;

/// One parsed train row. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct TrainRecord {
    /// Internal train number (distinct from the display code).
    pub train_no: String,

    /// Display train code, e.g. `G103`.
    pub train_code: String,

    /// Full-route origin telecode.
    pub start_telecode: Telecode,

    /// Full-route destination telecode.
    pub end_telecode: Telecode,

    /// Queried-segment origin telecode.
    pub from_telecode: Telecode,

    /// Queried-segment destination telecode.
    pub to_telecode: Telecode,

    /// Segment departure time, `HH:MM`.
    pub start_time: String,

    /// Segment arrival time, `HH:MM`.
    pub arrive_time: String,

    /// Segment duration, `HH:MM`.
    pub duration: String,

    /// Date the train departs its full-route origin, `YYYYMMDD`.
    pub start_train_date: String,

    /// Parsed seat counts, in upstream field order.
    seats: Vec<(SeatCategory, SeatCount)>,
}

impl TrainRecord {
    /// Parse one raw API row.
    ///
    /// Fails with [`RailwayError::MalformedRecord`] when the row has too
    /// few fields or a telecode field is not a valid telecode.
    pub fn parse(row: &str) -> Result<Self, RailwayError> {
        let fields: Vec<&str> = row.split('|').collect();

        if fields.len() < ROW_FIELDS {
            return Err(RailwayError::MalformedRecord(format!(
                "expected at least {ROW_FIELDS} fields, got {}",
                fields.len()
            )));
        }

        let telecode = |index: usize, name: &str| {
            Telecode::parse(fields[index]).map_err(|e| {
                RailwayError::MalformedRecord(format!("{name} {:?}: {e}", fields[index]))
            })
        };

        let seats = SeatCategory::ALL
            .into_iter()
            .enumerate()
            .map(|(offset, category)| (category, SeatCount::parse(fields[SEAT_FIELD_BASE + offset])))
            .collect();

        Ok(TrainRecord {
            train_no: fields[2].to_string(),
            train_code: fields[3].to_string(),
            start_telecode: telecode(4, "start telecode")?,
            end_telecode: telecode(5, "end telecode")?,
            from_telecode: telecode(6, "from telecode")?,
            to_telecode: telecode(7, "to telecode")?,
            start_time: fields[8].to_string(),
            arrive_time: fields[9].to_string(),
            duration: fields[10].to_string(),
            start_train_date: fields[13].to_string(),
            seats,
        })
    }

    /// Seat counts per category, in upstream field order.
    pub fn seats(&self) -> impl Iterator<Item = (SeatCategory, &SeatCount)> {
        self.seats.iter().map(|(category, count)| (*category, count))
    }

    /// The seat count for one category.
    pub fn seat(&self, category: SeatCategory) -> &SeatCount {
        &self
            .seats
            .iter()
            .find(|(c, _)| *c == category)
            .expect("all categories are populated at parse time")
            .1
    }

    /// Whether this record covers the train's full route, i.e. the
    /// queried segment spans the route's origin and destination.
    pub fn is_full_route(&self) -> bool {
        self.from_telecode == self.start_telecode && self.to_telecode == self.end_telecode
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a well-formed row. `seat_values` assigns raw values to seat
    /// fields by category; everything else gets a plausible default.
    pub(crate) fn sample_row(
        train_code: &str,
        seat_values: &[(SeatCategory, &str)],
    ) -> String {
        let mut fields = vec![String::new(); ROW_FIELDS];
        fields[0] = "secret".to_string();
        fields[1] = "预订".to_string();
        fields[2] = "24000000G103".to_string();
        fields[3] = train_code.to_string();
        fields[4] = "VNP".to_string();
        fields[5] = "AOH".to_string();
        fields[6] = "VNP".to_string();
        fields[7] = "AOH".to_string();
        fields[8] = "09:00".to_string();
        fields[9] = "14:35".to_string();
        fields[10] = "05:35".to_string();
        fields[11] = "Y".to_string();
        fields[13] = "20260815".to_string();

        for (category, value) in seat_values {
            let offset = SeatCategory::ALL
                .iter()
                .position(|c| c == category)
                .unwrap();
            fields[SEAT_FIELD_BASE + offset] = value.to_string();
        }

        fields.join("|")
    }

    #[test]
    fn parse_well_formed_row() {
        let row = sample_row(
            "G103",
            &[
                (SeatCategory::SecondClass, "有"),
                (SeatCategory::FirstClass, "3"),
                (SeatCategory::BusinessClass, "无"),
            ],
        );

        let record = TrainRecord::parse(&row).unwrap();

        assert_eq!(record.train_code, "G103");
        assert_eq!(record.start_telecode, Telecode::parse("VNP").unwrap());
        assert_eq!(record.end_telecode, Telecode::parse("AOH").unwrap());
        assert_eq!(record.start_time, "09:00");
        assert_eq!(record.arrive_time, "14:35");
        assert_eq!(record.duration, "05:35");
        assert_eq!(record.start_train_date, "20260815");

        assert_eq!(record.seat(SeatCategory::SecondClass), &SeatCount::Available);
        assert_eq!(record.seat(SeatCategory::FirstClass), &SeatCount::Seats(3));
        assert_eq!(record.seat(SeatCategory::BusinessClass), &SeatCount::SoldOut);
        assert_eq!(record.seat(SeatCategory::HardSeat), &SeatCount::NotOffered);
    }

    #[test]
    fn short_row_rejected() {
        let err = TrainRecord::parse("a|b|c").unwrap_err();
        assert!(matches!(err, RailwayError::MalformedRecord(_)));
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn bad_telecode_rejected() {
        let mut fields: Vec<String> = sample_row("G103", &[])
            .split('|')
            .map(str::to_string)
            .collect();
        fields[6] = "not-a-code".to_string();

        let err = TrainRecord::parse(&fields.join("|")).unwrap_err();
        assert!(matches!(err, RailwayError::MalformedRecord(_)));
        assert!(err.to_string().contains("from telecode"));
    }

    #[test]
    fn opaque_categories_pass_through() {
        let row = sample_row(
            "K512",
            &[(SeatCategory::Yb, "7"), (SeatCategory::Srrb, "candidate")],
        );

        let record = TrainRecord::parse(&row).unwrap();

        assert_eq!(record.seat(SeatCategory::Yb), &SeatCount::Seats(7));
        assert_eq!(
            record.seat(SeatCategory::Srrb),
            &SeatCount::Raw("candidate".to_string())
        );
    }

    #[test]
    fn seats_iterates_in_field_order() {
        let row = sample_row("G103", &[]);
        let record = TrainRecord::parse(&row).unwrap();

        let categories: Vec<SeatCategory> = record.seats().map(|(c, _)| c).collect();
        assert_eq!(categories, SeatCategory::ALL);
    }

    #[test]
    fn full_route_detection() {
        let row = sample_row("G103", &[]);
        let record = TrainRecord::parse(&row).unwrap();
        // sample_row queries the full route (from == start, to == end)
        assert!(record.is_full_route());

        let mut fields: Vec<String> = row.split('|').map(str::to_string).collect();
        fields[6] = "BXP".to_string();
        let segment = TrainRecord::parse(&fields.join("|")).unwrap();
        assert!(!segment.is_full_route());
    }
}
