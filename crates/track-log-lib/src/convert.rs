//! Type converters between wire text and typed values
//!
//! Every converter is stateless and bidirectional. Reading blank text yields "no value"
//! rather than a zero or an error, so optional elements such as `<ele></ele>` simply
//! decode as absent.

use time::{Date, Month, PrimitiveDateTime, Time};

/// Timestamps are stored at second resolution in UTC.
pub type Timestamp = PrimitiveDateTime;

/// Conversion failure for a single wire value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("not a number: {0:?}")]
    Number(String),

    #[error("not a non-negative integer: {0:?}")]
    Integer(String),

    #[error("invalid time {text:?}: {reason}")]
    Timestamp { text: String, reason: String },
}

/// A value that can be read from and written to XML text
pub trait WireValue: Sized {
    /// Parse wire text, returning `Ok(None)` for blank input
    fn from_wire(text: &str) -> Result<Option<Self>, ConvertError>;

    /// Canonical wire representation
    fn to_wire(&self) -> String;

    /// Whether the value counts as set for conditional wrappers
    fn is_present(&self) -> bool {
        true
    }
}

impl WireValue for f64 {
    fn from_wire(text: &str) -> Result<Option<Self>, ConvertError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(ConvertError::Number(text.to_string())),
        }
    }

    fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl WireValue for u32 {
    fn from_wire(text: &str) -> Result<Option<Self>, ConvertError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<u32>()
            .map(Some)
            .map_err(|_| ConvertError::Integer(text.to_string()))
    }

    fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl WireValue for String {
    fn from_wire(text: &str) -> Result<Option<Self>, ConvertError> {
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text.to_string()))
        }
    }

    fn to_wire(&self) -> String {
        self.clone()
    }

    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl WireValue for Timestamp {
    fn from_wire(text: &str) -> Result<Option<Self>, ConvertError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        parse_time(text).map(Some)
    }

    fn to_wire(&self) -> String {
        format_time(self)
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SSZ`
///
/// Sub-second precision is dropped.
pub fn format_time(time: &Timestamp) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        time.year(),
        u8::from(time.month()),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// Parse a timestamp leniently
///
/// Accepts the canonical `YYYY-MM-DDTHH:MM:SSZ` form and the usual deviations found in
/// the wild: a space instead of `T`, a missing `Z`, fractional seconds, a trailing
/// `+HH:MM` / `-HH:MM` offset and single-digit components. Fractions and offsets are
/// discarded; the result is always at second resolution.
pub fn parse_time(text: &str) -> Result<Timestamp, ConvertError> {
    let fail = |reason: &str| ConvertError::Timestamp {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let normalized = text.trim().replace('T', " ").replace('Z', "");
    let (date_part, time_part) = normalized
        .split_once(' ')
        .ok_or_else(|| fail("missing time of day"))?;

    // Offset: rightmost sign past the date portion
    let time_part = match time_part.rfind(['+', '-']) {
        Some(sign) => &time_part[..sign],
        None => time_part,
    };
    // Fractional seconds
    let time_part = match time_part.find('.') {
        Some(dot) => &time_part[..dot],
        None => time_part,
    };

    let date_fields = split_fields(date_part, '-').ok_or_else(|| fail("malformed date"))?;
    let time_fields = split_fields(time_part.trim(), ':').ok_or_else(|| fail("malformed time"))?;

    let [year, month, day] = date_fields;
    let [hour, minute, second] = time_fields;

    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| fail("month out of range"))?;
    let day = u8::try_from(day).map_err(|_| fail("day out of range"))?;
    let date = Date::from_calendar_date(year as i32, month, day)
        .map_err(|e| fail(&e.to_string()))?;

    let (hour, minute, second) = (
        u8::try_from(hour).map_err(|_| fail("hour out of range"))?,
        u8::try_from(minute).map_err(|_| fail("minute out of range"))?,
        u8::try_from(second).map_err(|_| fail("second out of range"))?,
    );
    let time = Time::from_hms(hour, minute, second).map_err(|e| fail(&e.to_string()))?;

    Ok(PrimitiveDateTime::new(date, time))
}

/// Split `a<sep>b<sep>c` into three numbers
///
/// The year (first field of a date) must have four digits, every other field one or two.
fn split_fields(text: &str, separator: char) -> Option<[u32; 3]> {
    let mut parts = text.split(separator);
    let mut fields = [0u32; 3];
    for (index, field) in fields.iter_mut().enumerate() {
        let part = parts.next()?;
        let is_year = index == 0 && separator == '-';
        let valid_len = if is_year { part.len() == 4 } else { (1..=2).contains(&part.len()) };
        if !valid_len || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *field = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(fields)
}
