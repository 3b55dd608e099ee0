//! Station telecode type.

use std::fmt;

/// Error returned when parsing an invalid telecode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid telecode: {reason}")]
pub struct InvalidTelecode {
    reason: &'static str,
}

/// A valid 3-letter station telecode.
///
/// Telecodes are the ticketing system's internal station identifiers,
/// distinct from the display names shown to passengers. They are always
/// 3 uppercase ASCII letters; this type guarantees that any `Telecode`
/// value is valid by construction.
///
/// # Examples
///
/// ```
/// use ticket_monitor::domain::Telecode;
///
/// let bjp = Telecode::parse("BJP").unwrap();
/// assert_eq!(bjp.as_str(), "BJP");
///
/// // Lowercase is rejected
/// assert!(Telecode::parse("bjp").is_err());
///
/// // Wrong length is rejected
/// assert!(Telecode::parse("BJ").is_err());
/// assert!(Telecode::parse("BJPX").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Telecode([u8; 3]);

impl Telecode {
    /// Parse a telecode from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidTelecode> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidTelecode {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(InvalidTelecode {
                    reason: "must be uppercase ASCII letters A-Z",
                });
            }
        }

        Ok(Telecode([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the telecode as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: We only store valid ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Debug for Telecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Telecode({})", self.as_str())
    }
}

impl fmt::Display for Telecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating valid telecodes: 3 uppercase ASCII letters
    fn valid_telecode_string() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[A-Z]{3}")
            .unwrap()
            .prop_filter("must be 3 chars", |s| s.len() == 3)
    }

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in valid_telecode_string()) {
            let code = Telecode::parse(&s).unwrap();
            prop_assert_eq!(code.as_str(), s.as_str());
        }

        /// Any valid telecode can be parsed
        #[test]
        fn valid_always_parses(s in valid_telecode_string()) {
            prop_assert!(Telecode::parse(&s).is_ok());
        }

        /// Lowercase letters are always rejected
        #[test]
        fn lowercase_rejected(s in "[a-z]{3}") {
            prop_assert!(Telecode::parse(&s).is_err());
        }

        /// Wrong-length strings are always rejected
        #[test]
        fn wrong_length_rejected(s in "[A-Z]{0,2}|[A-Z]{4,10}") {
            prop_assert!(Telecode::parse(&s).is_err());
        }

        /// Strings with digits are rejected
        #[test]
        fn digits_rejected(s in "[A-Z0-9]{3}".prop_filter("has digit", |s| s.chars().any(|c| c.is_ascii_digit()))) {
            prop_assert!(Telecode::parse(&s).is_err());
        }
    }
}
