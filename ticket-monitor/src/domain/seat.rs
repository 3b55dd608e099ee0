//! Seat categories and raw seat-count values.
//!
//! The left-ticket API reports one sellable-count field per accommodation
//! class. The set of classes is fixed by the upstream row format. Two of
//! the fields (`YB`, `SRRB`) have no documented meaning upstream; they are
//! carried through verbatim and never interpreted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One class of accommodation with its own sellable-count field.
///
/// Variants are ordered as the fields appear in the upstream row. The
/// serialized form is the display label used in configuration files and
/// alert messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatCategory {
    /// 优选一等座
    #[serde(rename = "优选一等座")]
    PremiumFirstClass,
    /// 高级软卧
    #[serde(rename = "高级软卧")]
    DeluxeSoftSleeper,
    /// 其他
    #[serde(rename = "其他")]
    Other,
    /// 软卧
    #[serde(rename = "软卧")]
    SoftSleeper,
    /// 软座
    #[serde(rename = "软座")]
    SoftSeat,
    /// 特等座
    #[serde(rename = "特等座")]
    SpecialClass,
    /// 无座
    #[serde(rename = "无座")]
    Standing,
    /// Upstream semantics unknown; passed through as-is.
    #[serde(rename = "YB")]
    Yb,
    /// 硬卧
    #[serde(rename = "硬卧")]
    HardSleeper,
    /// 硬座
    #[serde(rename = "硬座")]
    HardSeat,
    /// 二等座
    #[serde(rename = "二等座")]
    SecondClass,
    /// 一等座
    #[serde(rename = "一等座")]
    FirstClass,
    /// 商务座
    #[serde(rename = "商务座")]
    BusinessClass,
    /// Upstream semantics unknown; passed through as-is.
    #[serde(rename = "SRRB")]
    Srrb,
}

impl SeatCategory {
    /// All categories, in upstream row-field order.
    pub const ALL: [SeatCategory; 14] = [
        SeatCategory::PremiumFirstClass,
        SeatCategory::DeluxeSoftSleeper,
        SeatCategory::Other,
        SeatCategory::SoftSleeper,
        SeatCategory::SoftSeat,
        SeatCategory::SpecialClass,
        SeatCategory::Standing,
        SeatCategory::Yb,
        SeatCategory::HardSleeper,
        SeatCategory::HardSeat,
        SeatCategory::SecondClass,
        SeatCategory::FirstClass,
        SeatCategory::BusinessClass,
        SeatCategory::Srrb,
    ];

    /// The display label, matching the upstream seat-class names.
    pub fn label(&self) -> &'static str {
        match self {
            SeatCategory::PremiumFirstClass => "优选一等座",
            SeatCategory::DeluxeSoftSleeper => "高级软卧",
            SeatCategory::Other => "其他",
            SeatCategory::SoftSleeper => "软卧",
            SeatCategory::SoftSeat => "软座",
            SeatCategory::SpecialClass => "特等座",
            SeatCategory::Standing => "无座",
            SeatCategory::Yb => "YB",
            SeatCategory::HardSleeper => "硬卧",
            SeatCategory::HardSeat => "硬座",
            SeatCategory::SecondClass => "二等座",
            SeatCategory::FirstClass => "一等座",
            SeatCategory::BusinessClass => "商务座",
            SeatCategory::Srrb => "SRRB",
        }
    }

    /// Look up a category by its display label.
    pub fn from_label(label: &str) -> Option<Self> {
        SeatCategory::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed sellable-count field.
///
/// Raw values are one of: empty string (class not sold on this train),
/// `无` (sold out), `有` (available, count not disclosed), or a decimal
/// count. Anything else is preserved as [`SeatCount::Raw`] so unexpected
/// upstream values still surface in summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatCount {
    /// Empty field: the class is not offered on this train.
    NotOffered,
    /// `无`: offered but sold out.
    SoldOut,
    /// `有`: seats available, exact count not disclosed.
    Available,
    /// A concrete remaining-seat count.
    Seats(u32),
    /// Any other non-empty value, preserved verbatim.
    Raw(String),
}

impl SeatCount {
    /// Parse a raw field value.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => SeatCount::NotOffered,
            "无" => SeatCount::SoldOut,
            "有" => SeatCount::Available,
            other => match other.parse::<u32>() {
                Ok(n) => SeatCount::Seats(n),
                Err(_) => SeatCount::Raw(other.to_string()),
            },
        }
    }

    /// Whether any seats can be bought in this class.
    ///
    /// Empty and sold-out fields are not sellable; everything else is
    /// treated as present, including unrecognized raw values.
    pub fn is_sellable(&self) -> bool {
        !matches!(self, SeatCount::NotOffered | SeatCount::SoldOut)
    }
}

impl fmt::Display for SeatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatCount::NotOffered => Ok(()),
            SeatCount::SoldOut => f.write_str("无"),
            SeatCount::Available => f.write_str("有"),
            SeatCount::Seats(n) => write!(f, "{n}"),
            SeatCount::Raw(s) => f.write_str(s),
        }
    }
}
