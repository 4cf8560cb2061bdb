//! Content datatypes for import elements
//!
//! Every element of an import schema declares one content kind. The check is
//! a pure predicate over the element's accumulated character data after
//! trimming surrounding whitespace.

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Earliest year accepted by the calendar check
pub const MIN_YEAR: i32 = 1970;
/// Latest year accepted by the calendar check
pub const MAX_YEAR: i32 = 2038;

/// Sentinel date meaning "not set"; always accepted
pub const EPOCH_DATE: &str = "1970-01-01";

/// Declared content kind of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatatypeKind {
    /// Grouping element; its own character data is not checked
    NoContent,
    /// Any non-blank text
    Text,
    /// Unsigned decimal digits, no bounds
    Integer,
    /// Unsigned decimal digits within `min..=max` (no upper bound when `max` is None)
    BoundedInteger { min: u64, max: Option<u64> },
    /// Pairs of hexadecimal digits
    HexBinary,
    /// Base64 with optional trailing padding
    Base64Binary,
    /// Exactly 32 hexadecimal digits
    Uuid,
    /// `yyyy-mm-dd`
    Date,
    /// `hh:mm:ss`
    Time,
    /// The literal digits `0` or `1`
    Boolean,
    /// Exactly one character
    Character,
    /// One of a fixed set of strings
    Enumeration(&'static [&'static str]),
}

impl DatatypeKind {
    /// Check a raw element value against this kind.
    ///
    /// The value is trimmed first. Empty or whitespace-only content fails for
    /// every kind except [`DatatypeKind::NoContent`].
    pub fn is_valid(&self, value: &str) -> bool {
        if matches!(self, DatatypeKind::NoContent) {
            return true;
        }

        let value = trim(value);
        if value.is_empty() {
            return false;
        }

        match *self {
            DatatypeKind::NoContent => true,
            DatatypeKind::Text => true,
            DatatypeKind::Integer => is_digits(value),
            DatatypeKind::BoundedInteger { min, max } => verify_bounded_integer(value, min, max),
            DatatypeKind::HexBinary => verify_hex_binary(value),
            DatatypeKind::Base64Binary => verify_base64_binary(value),
            DatatypeKind::Uuid => value.len() == 32 && verify_hex_binary(value),
            DatatypeKind::Date => verify_date(value),
            DatatypeKind::Time => verify_time(value),
            DatatypeKind::Boolean => value == "0" || value == "1",
            DatatypeKind::Character => value.chars().count() == 1,
            DatatypeKind::Enumeration(allowed) => allowed.contains(&value),
        }
    }

    /// Short name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DatatypeKind::NoContent => "none",
            DatatypeKind::Text => "string",
            DatatypeKind::Integer => "integer",
            DatatypeKind::BoundedInteger { .. } => "bounded-integer",
            DatatypeKind::HexBinary => "hexBinary",
            DatatypeKind::Base64Binary => "base64Binary",
            DatatypeKind::Uuid => "uuid",
            DatatypeKind::Date => "date",
            DatatypeKind::Time => "time",
            DatatypeKind::Boolean => "boolean",
            DatatypeKind::Character => "character",
            DatatypeKind::Enumeration(_) => "enumeration",
        }
    }
}

impl fmt::Display for DatatypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatatypeKind::BoundedInteger { min, max: Some(max) } => {
                write!(f, "integer {}..={}", min, max)
            }
            DatatypeKind::BoundedInteger { min, max: None } => write!(f, "integer >= {}", min),
            DatatypeKind::Enumeration(allowed) => write!(f, "one of {}", allowed.join("|")),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Strip the whitespace an XML writer may place around element content
pub fn trim(value: &str) -> &str {
    value.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Digits only, within the inclusive range
pub fn verify_bounded_integer(value: &str, min: u64, max: Option<u64>) -> bool {
    if !is_digits(value) {
        return false;
    }

    match value.parse::<u64>() {
        Ok(n) => n >= min && max.map_or(true, |max| n <= max),
        // Too many digits for u64: only an open upper bound can hold it
        Err(_) => max.is_none(),
    }
}

// =============================================================================
// Binary Validators
// =============================================================================

/// Pattern for validating hexadecimal binary strings
const HEX_BINARY_PATTERN: &str = r"^([0-9a-fA-F]{2})*$";

lazy_static::lazy_static! {
    static ref HEX_BINARY_REGEX: regex::Regex = regex::Regex::new(HEX_BINARY_PATTERN).unwrap();

    // Standard alphabet; padding is only allowed at the end and the final
    // quantum's unused bits are not required to be zero.
    static ref BASE64_ENGINE: GeneralPurpose = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
    );
}

/// Even number of hex digits, at least one pair
pub fn verify_hex_binary(value: &str) -> bool {
    !value.is_empty() && HEX_BINARY_REGEX.is_match(value)
}

/// Length a multiple of four, base64 alphabet, `=` padding only at the end
pub fn verify_base64_binary(value: &str) -> bool {
    if value.is_empty() || value.len() % 4 != 0 {
        return false;
    }
    BASE64_ENGINE.decode(value).is_ok()
}

// =============================================================================
// Date and Time Validators
// =============================================================================

lazy_static::lazy_static! {
    static ref DATE_REGEX: regex::Regex =
        regex::Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").unwrap();
    static ref TIME_REGEX: regex::Regex =
        regex::Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2})$").unwrap();
}

/// Calendar and clock correctness of a full timestamp.
///
/// Shared by the date and time checks, which feed a fixed time or a fixed
/// date respectively.
pub fn verify_date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> bool {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return false;
    }
    NaiveDate::from_ymd_opt(year, month, day).is_some()
        && NaiveTime::from_hms_opt(hour, minute, second).is_some()
}

/// `yyyy-mm-dd` naming a real calendar day
pub fn verify_date(value: &str) -> bool {
    if value == EPOCH_DATE {
        return true;
    }

    let Some(caps) = DATE_REGEX.captures(value) else {
        return false;
    };
    match (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
        (Ok(year), Ok(month), Ok(day)) => verify_date_time(year, month, day, 0, 0, 0),
        _ => false,
    }
}

/// `hh:mm:ss` naming a real time of day
pub fn verify_time(value: &str) -> bool {
    let Some(caps) = TIME_REGEX.captures(value) else {
        return false;
    };
    match (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
        (Ok(hour), Ok(minute), Ok(second)) => verify_date_time(MIN_YEAR, 1, 1, hour, minute, second),
        _ => false,
    }
}
