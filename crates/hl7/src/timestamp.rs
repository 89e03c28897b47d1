//! HL7 `TS`/`DTM` timestamp parsing.
//!
//! HL7 timestamps carry variable precision: `YYYY[MM[DD[HH[MM[SS[.S[S[S[S]]]]]]]]][+/-ZZZZ]`.
//! Missing trailing parts default to the start of the period.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// A timestamp could not be interpreted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid HL7 timestamp `{value}`: {reason}")]
pub struct InvalidTimestamp {
    pub value: String,
    pub reason: &'static str,
}

/// A parsed HL7 timestamp: local date-time plus the UTC offset when the sender supplied one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hl7Timestamp {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Hl7Timestamp {
    /// Parse an HL7 timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTimestamp`] if the value is empty, has an unsupported precision, or
    /// names a date or time that does not exist.
    pub fn parse(raw: &str) -> Result<Self, InvalidTimestamp> {
        let value = raw.trim();
        let invalid = |reason: &'static str| InvalidTimestamp {
            value: value.to_string(),
            reason,
        };

        if value.is_empty() {
            return Err(invalid("empty value"));
        }

        let (body, offset) = match value.find(|c: char| c == '+' || c == '-') {
            Some(pos) => {
                let offset =
                    parse_offset(&value[pos..]).ok_or_else(|| invalid("bad UTC offset"))?;
                (&value[..pos], Some(offset))
            }
            None => (value, None),
        };

        let (digits, fraction) = match body.split_once('.') {
            Some((d, f)) => (d, Some(f)),
            None => (body, None),
        };

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("non-digit characters"));
        }
        if !matches!(digits.len(), 4 | 6 | 8 | 10 | 12 | 14) {
            return Err(invalid("unsupported precision"));
        }
        if fraction.is_some() && digits.len() != 14 {
            return Err(invalid("fractional seconds require second precision"));
        }

        let part = |range: std::ops::Range<usize>, default: u32| -> u32 {
            digits
                .get(range)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        let year = digits[0..4]
            .parse::<i32>()
            .map_err(|_| invalid("bad year"))?;
        let date = NaiveDate::from_ymd_opt(year, part(4..6, 1), part(6..8, 1))
            .ok_or_else(|| invalid("date does not exist"))?;

        let nanos = match fraction {
            Some(f) => parse_fraction(f).ok_or_else(|| invalid("bad fractional seconds"))?,
            None => 0,
        };
        let time =
            NaiveTime::from_hms_nano_opt(part(8..10, 0), part(10..12, 0), part(12..14, 0), nanos)
                .ok_or_else(|| invalid("time does not exist"))?;

        Ok(Self {
            datetime: NaiveDateTime::new(date, time),
            offset,
        })
    }

    /// ISO-8601 rendering using a `chrono` format string for the local part.
    ///
    /// The UTC offset, when known, is appended as `+HH:MM`.
    pub fn render(&self, format: &str) -> String {
        let local = self.datetime.format(format).to_string();
        match self.offset {
            Some(offset) => format!("{local}{offset}"),
            None => local,
        }
    }
}

/// Parse the date portion of an HL7 date or timestamp (`YYYYMMDD...`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, InvalidTimestamp> {
    let value = raw.trim();
    if value.len() < 8 {
        return Err(InvalidTimestamp {
            value: value.to_string(),
            reason: "date requires day precision",
        });
    }
    Hl7Timestamp::parse(value).map(|ts| ts.datetime.date())
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = raw.split_at(1);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[0..2].parse().ok()?;
    let minutes: i32 = digits[2..4].parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

fn parse_fraction(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{raw:0<9}");
    padded.parse().ok()
}
