//! HL7 v2 wire support for lab result ingestion.
//!
//! This crate turns raw ORU^R01 text into a typed, immutable message model:
//! - tokenizing segments, fields, repetitions, components and subcomponents
//! - decoding escape sequences against the declared encoding characters
//! - grouping observations under the order that precedes them
//!
//! Nothing here knows about critical thresholds or downstream EMR formats. The
//! `labflow-core` crate builds on this model.

pub mod builder;
pub mod encoding;
pub mod model;
pub mod segments;
pub mod timestamp;
pub mod tokenizer;

#[cfg(test)]
mod fixtures;

pub use builder::build_message;
pub use encoding::EncodingCharacters;
pub use model::{
    Address, CodedElement, FieldWarning, Header, MessageType, Observation, ObservationValue,
    Order, OruMessage, Patient, PatientIdentifier, PersonName, ValueType, WarningLocation,
};
pub use timestamp::{Hl7Timestamp, InvalidTimestamp};
pub use tokenizer::{tokenize, Segment, TokenizedMessage};

/// Errors returned by the `hl7` crate.
///
/// Every variant carries a location so that a failed message can be traced back to the
/// segment (or byte offset) that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Hl7Error {
    #[error("malformed message at segment {segment_index}: {reason}")]
    MalformedMessage { segment_index: usize, reason: String },

    #[error("missing required {segment} segment at segment {segment_index}: {detail}")]
    MissingRequiredSegment {
        segment: &'static str,
        segment_index: usize,
        detail: String,
    },

    #[error("encoding mismatch at offset {offset}: {reason}")]
    EncodingMismatch { offset: usize, reason: String },
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;

/// Parse a raw ORU^R01 message using the encoding characters it declares in MSH-2.
pub fn parse_message(raw: &str) -> Hl7Result<OruMessage> {
    build_message(&tokenize(raw, None)?)
}

/// Parse a raw message with explicitly supplied encoding characters.
///
/// The declaration in MSH-1/MSH-2 must agree with `encoding`, otherwise
/// [`Hl7Error::EncodingMismatch`] is returned.
pub fn parse_message_with_encoding(
    raw: &str,
    encoding: EncodingCharacters,
) -> Hl7Result<OruMessage> {
    build_message(&tokenize(raw, Some(encoding))?)
}
