//! Typed ORU^R01 message model.
//!
//! The model is built once per message by [`crate::builder::build_message`]. Everything is
//! taken from the wire as sent; the only derived value is [`Observation::critical`], which
//! stays `None` until a critical value evaluator annotates the message.

use chrono::NaiveDate;
use labflow_types::NonEmptyText;
use serde::Serialize;

use crate::encoding::EncodingCharacters;
use crate::timestamp::Hl7Timestamp;

// ============================================================================
// Message
// ============================================================================

/// A parsed laboratory result message.
#[derive(Clone, Debug, PartialEq)]
pub struct OruMessage {
    pub header: Header,
    pub patient: Patient,
    /// Orders in document order.
    pub orders: Vec<Order>,
    /// Non-fatal field problems found while building the model.
    pub warnings: Vec<FieldWarning>,
}

impl OruMessage {
    /// All observations in document order with their order and observation indices.
    pub fn observations(&self) -> impl Iterator<Item = (usize, usize, &Observation)> {
        self.orders.iter().enumerate().flat_map(|(o, order)| {
            order
                .observations
                .iter()
                .enumerate()
                .map(move |(i, obs)| (o, i, obs))
        })
    }

    pub fn observation_count(&self) -> usize {
        self.orders.iter().map(|o| o.observations.len()).sum()
    }

    /// True once every observation carries a critical flag.
    pub fn is_evaluated(&self) -> bool {
        self.observations().all(|(_, _, obs)| obs.critical.is_some())
    }
}

// ============================================================================
// Header
// ============================================================================

/// MSH contents.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    pub timestamp: Option<Hl7Timestamp>,
    pub message_type: MessageType,
    pub control_id: String,
    pub processing_id: String,
    pub version_id: String,
    pub encoding: EncodingCharacters,
}

/// MSH-9 message code and trigger event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageType {
    pub code: String,
    pub trigger_event: String,
}

impl MessageType {
    pub fn is_oru_r01(&self) -> bool {
        self.code == "ORU" && self.trigger_event == "R01"
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}^{}", self.code, self.trigger_event)
    }
}

// ============================================================================
// Patient
// ============================================================================

/// PID contents.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Patient {
    /// PID-3. Absent when no repetition carries an ID number.
    pub identifier: Option<PatientIdentifier>,
    /// PID-2. Kept separately; never substituted for PID-3.
    pub alternate_id: Option<String>,
    pub name: PersonName,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientIdentifier {
    pub id: NonEmptyText,
    pub assigning_authority: Option<String>,
    pub identifier_type: Option<String>,
}

/// PID-5 name components.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PersonName {
    pub family: String,
    pub given: String,
    pub middle: String,
}

impl PersonName {
    /// Given, middle and family names joined by single spaces, empty parts omitted.
    pub fn formatted(&self) -> String {
        [&self.given, &self.middle, &self.family]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.formatted().is_empty()
    }
}

/// PID-11 address components.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Address {
    pub street: String,
    pub other: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// ============================================================================
// Orders and observations
// ============================================================================

/// A coded element (CE/CWE): code, display text, coding system.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CodedElement {
    pub code: String,
    pub text: String,
    pub coding_system: String,
}

impl CodedElement {
    /// Display text, falling back to the code.
    pub fn display_name(&self) -> &str {
        if self.text.trim().is_empty() {
            &self.code
        } else {
            &self.text
        }
    }
}

/// OBR contents plus the observations that follow it.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub set_id: String,
    pub placer_order_number: Option<String>,
    pub filler_order_number: Option<String>,
    pub service: CodedElement,
    pub observed_at: Option<Hl7Timestamp>,
    pub notes: Vec<String>,
    pub observations: Vec<Observation>,
}

impl Order {
    /// Placer order number, or the filler (accession) number when no placer number was sent.
    pub fn order_id(&self) -> Option<&str> {
        self.placer_order_number
            .as_deref()
            .or(self.filler_order_number.as_deref())
    }
}

/// OBX-2 value type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    /// `NM`
    Numeric,
    /// `ST`, `TX`, `FT`
    Text,
    /// Any other tag, as sent.
    Other(String),
}

impl ValueType {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "NM" => Self::Numeric,
            "ST" | "TX" | "FT" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Numeric => "NM",
            Self::Text => "ST",
            Self::Other(tag) => tag,
        }
    }
}

/// OBX-5 as interpreted through the value type.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationValue {
    /// A value declared `NM` that parsed as a decimal number.
    Numeric { raw: String, value: f64 },
    /// Anything else, including `NM` values that failed to parse.
    Text(String),
}

impl ObservationValue {
    /// The value exactly as sent.
    pub fn raw(&self) -> &str {
        match self {
            Self::Numeric { raw, .. } => raw,
            Self::Text(text) => text,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric { value, .. } => Some(*value),
            Self::Text(_) => None,
        }
    }
}

/// OBX contents.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub set_id: String,
    pub value_type: ValueType,
    pub identifier: CodedElement,
    pub value: ObservationValue,
    pub units: String,
    pub reference_range: String,
    pub abnormal_flag: String,
    pub status: String,
    pub observed_at: Option<Hl7Timestamp>,
    pub notes: Vec<String>,
    /// Derived by the critical value evaluator; `None` until evaluated.
    pub critical: Option<bool>,
}

/// Parse a decimal number: optional sign, digits, at most one decimal point.
///
/// Comparators (`<5`), thousands separators, exponents and anything else are rejected.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let value = raw.trim();
    let unsigned = value.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(value);

    let mut digits = 0;
    let mut points = 0;
    for b in unsigned.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => points += 1,
            _ => return None,
        }
    }
    if digits == 0 || points > 1 {
        return None;
    }
    value.parse::<f64>().ok()
}

// ============================================================================
// Warnings
// ============================================================================

/// Where a non-fatal field problem was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum WarningLocation {
    Header,
    Patient,
    Order { order: usize },
    Observation { order: usize, observation: usize },
}

/// A field that could not be interpreted; the rest of the message is still usable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldWarning {
    pub location: WarningLocation,
    pub segment_index: usize,
    /// HL7 field label, e.g. `OBX-5`.
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl std::fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at segment {}: `{}` {}",
            self.field, self.segment_index, self.value, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_parsing_accepts_sign_and_single_point() {
        assert_eq!(parse_decimal("8.5"), Some(8.5));
        assert_eq!(parse_decimal("-0.25"), Some(-0.25));
        assert_eq!(parse_decimal("+7"), Some(7.0));
        assert_eq!(parse_decimal(" 32 "), Some(32.0));
        assert_eq!(parse_decimal(".5"), Some(0.5));
    }

    #[test]
    fn decimal_parsing_rejects_everything_else() {
        for raw in ["", "-", ".", "1.2.3", "<5", ">400", "1e3", "1,000", "NaN", "inf", "POS", "--1"] {
            assert_eq!(parse_decimal(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn formats_names_skipping_empty_parts() {
        let name = PersonName {
            family: "DOE".into(),
            given: "JOHN".into(),
            middle: "A".into(),
        };
        assert_eq!(name.formatted(), "JOHN A DOE");

        let name = PersonName {
            family: "DOE".into(),
            given: "JOHN".into(),
            middle: String::new(),
        };
        assert_eq!(name.formatted(), "JOHN DOE");
        assert!(PersonName::default().is_empty());
    }

    #[test]
    fn value_type_tags() {
        assert_eq!(ValueType::from_tag("nm"), ValueType::Numeric);
        assert_eq!(ValueType::from_tag("TX"), ValueType::Text);
        assert_eq!(ValueType::from_tag("CWE"), ValueType::Other("CWE".into()));
        assert_eq!(ValueType::from_tag(" sn ").tag(), "SN");
        assert_eq!(ValueType::from_tag("FT").tag(), "ST");
        assert_eq!(ValueType::Numeric.tag(), "NM");
    }

    #[test]
    fn order_id_falls_back_to_filler_number() {
        let order = Order {
            set_id: "1".into(),
            placer_order_number: None,
            filler_order_number: Some("LAB1".into()),
            service: CodedElement::default(),
            observed_at: None,
            notes: vec![],
            observations: vec![],
        };
        assert_eq!(order.order_id(), Some("LAB1"));
    }

    #[test]
    fn warning_serializes_with_scope_tag() {
        let warning = FieldWarning {
            location: WarningLocation::Observation {
                order: 1,
                observation: 0,
            },
            segment_index: 6,
            field: "OBX-5",
            value: "<5".into(),
            reason: "declared numeric but is not a decimal number; kept as text".into(),
        };

        let json = serde_json::to_value(&warning).expect("serialize");
        assert_eq!(json["location"]["scope"], "observation");
        assert_eq!(json["location"]["order"], 1);
        assert_eq!(json["field"], "OBX-5");
        assert_eq!(
            warning.to_string(),
            "OBX-5 at segment 6: `<5` declared numeric but is not a decimal number; kept as text"
        );
    }
}
