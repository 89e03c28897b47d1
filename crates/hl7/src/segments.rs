//! Typed segment views.
//!
//! Each segment kind the lab result model needs gets its own view type with named accessors,
//! so the builder never indexes fields by number. A view can only be constructed from a
//! segment carrying at least the fields the model reads positionally up to the last required
//! one; shorter segments are rejected as malformed.

use crate::tokenizer::{Field, Segment};
use crate::{Hl7Error, Hl7Result};

pub const MSH: &str = "MSH";
pub const PID: &str = "PID";
pub const OBR: &str = "OBR";
pub const OBX: &str = "OBX";
pub const NTE: &str = "NTE";

/// A tokenized segment classified by its identifier.
#[derive(Clone, Copy, Debug)]
pub enum TypedSegment<'a> {
    Header(MshSegment<'a>),
    Patient(PidSegment<'a>),
    Order(ObrSegment<'a>),
    Observation(ObxSegment<'a>),
    Note(NteSegment<'a>),
    /// Any segment the model does not use (EVN, PV1, ORC, SPM, Z-segments, ...).
    Unrecognized(&'a Segment),
}

impl<'a> TypedSegment<'a> {
    /// Classify a segment and check its minimum field count.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::MalformedMessage`] if a recognised segment is too short.
    pub fn classify(segment: &'a Segment) -> Hl7Result<Self> {
        Ok(match segment.id() {
            MSH => Self::Header(MshSegment(require(segment, 10)?)),
            PID => Self::Patient(PidSegment(require(segment, 3)?)),
            OBR => Self::Order(ObrSegment(require(segment, 4)?)),
            OBX => Self::Observation(ObxSegment(require(segment, 5)?)),
            NTE => Self::Note(NteSegment(segment)),
            _ => Self::Unrecognized(segment),
        })
    }
}

fn require(segment: &Segment, min_fields: usize) -> Hl7Result<&Segment> {
    if segment.field_count() < min_fields {
        return Err(Hl7Error::MalformedMessage {
            segment_index: segment.index(),
            reason: format!(
                "{} has {} fields, at least {} required",
                segment.id(),
                segment.field_count(),
                min_fields
            ),
        });
    }
    Ok(segment)
}

/// Message header (MSH).
#[derive(Clone, Copy, Debug)]
pub struct MshSegment<'a>(&'a Segment);

impl<'a> MshSegment<'a> {
    pub fn sending_application(&self) -> &'a str {
        self.0.component(3, 1)
    }

    pub fn sending_facility(&self) -> &'a str {
        self.0.component(4, 1)
    }

    pub fn receiving_application(&self) -> &'a str {
        self.0.component(5, 1)
    }

    pub fn receiving_facility(&self) -> &'a str {
        self.0.component(6, 1)
    }

    pub fn timestamp(&self) -> &'a str {
        self.0.component(7, 1)
    }

    pub fn message_code(&self) -> &'a str {
        self.0.component(9, 1)
    }

    pub fn trigger_event(&self) -> &'a str {
        self.0.component(9, 2)
    }

    pub fn control_id(&self) -> &'a str {
        self.0.text(10)
    }

    pub fn processing_id(&self) -> &'a str {
        self.0.component(11, 1)
    }

    pub fn version_id(&self) -> &'a str {
        self.0.component(12, 1)
    }
}

/// Patient identification (PID).
#[derive(Clone, Copy, Debug)]
pub struct PidSegment<'a>(&'a Segment);

/// PID-3 entry: CX data type, first three components that matter here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentifierRef<'a> {
    pub id: &'a str,
    pub assigning_authority: &'a str,
    pub identifier_type: &'a str,
}

impl<'a> PidSegment<'a> {
    /// PID-2, the external patient id.
    pub fn alternate_id(&self) -> &'a str {
        self.0.component(2, 1)
    }

    /// First PID-3 repetition that carries an ID number.
    pub fn identifier(&self) -> Option<IdentifierRef<'a>> {
        self.0
            .field(3)?
            .repetitions()
            .iter()
            .find(|r| !r.component(1).trim().is_empty())
            .map(|r| IdentifierRef {
                id: r.component(1),
                assigning_authority: r.component(4),
                identifier_type: r.component(5),
            })
    }

    pub fn family_name(&self) -> &'a str {
        self.0.component(5, 1)
    }

    pub fn given_name(&self) -> &'a str {
        self.0.component(5, 2)
    }

    pub fn middle_name(&self) -> &'a str {
        self.0.component(5, 3)
    }

    pub fn date_of_birth(&self) -> &'a str {
        self.0.component(7, 1)
    }

    pub fn sex(&self) -> &'a str {
        self.0.component(8, 1)
    }

    /// PID-11 (XAD), first repetition.
    pub fn address(&self) -> Option<&'a Field> {
        self.0.field(11)
    }
}

/// Observation request (OBR).
#[derive(Clone, Copy, Debug)]
pub struct ObrSegment<'a>(&'a Segment);

impl<'a> ObrSegment<'a> {
    pub fn set_id(&self) -> &'a str {
        self.0.text(1)
    }

    pub fn placer_order_number(&self) -> &'a str {
        self.0.component(2, 1)
    }

    pub fn filler_order_number(&self) -> &'a str {
        self.0.component(3, 1)
    }

    pub fn service_code(&self) -> &'a str {
        self.0.component(4, 1)
    }

    pub fn service_text(&self) -> &'a str {
        self.0.component(4, 2)
    }

    pub fn service_coding_system(&self) -> &'a str {
        self.0.component(4, 3)
    }

    pub fn observed_at(&self) -> &'a str {
        self.0.component(7, 1)
    }
}

/// Observation result (OBX).
#[derive(Clone, Copy, Debug)]
pub struct ObxSegment<'a>(&'a Segment);

impl<'a> ObxSegment<'a> {
    pub fn set_id(&self) -> &'a str {
        self.0.text(1)
    }

    pub fn value_type(&self) -> &'a str {
        self.0.component(2, 1)
    }

    pub fn code(&self) -> &'a str {
        self.0.component(3, 1)
    }

    pub fn display_name(&self) -> &'a str {
        self.0.component(3, 2)
    }

    pub fn coding_system(&self) -> &'a str {
        self.0.component(3, 3)
    }

    /// OBX-5 with escapes decoded; repetitions and components are kept as sent.
    pub fn value(&self) -> &'a str {
        self.0.text(5)
    }

    pub fn units(&self) -> &'a str {
        self.0.component(6, 1)
    }

    pub fn reference_range(&self) -> &'a str {
        self.0.text(7)
    }

    pub fn abnormal_flag(&self) -> &'a str {
        self.0.component(8, 1)
    }

    pub fn result_status(&self) -> &'a str {
        self.0.component(11, 1)
    }

    pub fn observed_at(&self) -> &'a str {
        self.0.component(14, 1)
    }
}

/// Notes and comments (NTE).
#[derive(Clone, Copy, Debug)]
pub struct NteSegment<'a>(&'a Segment);

impl<'a> NteSegment<'a> {
    /// NTE-3, all repetitions joined by line breaks.
    pub fn comment(&self) -> String {
        self.0
            .field(3)
            .map(|f| {
                f.repetitions()
                    .iter()
                    .map(|r| {
                        r.components()
                            .iter()
                            .map(|c| c.value())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}
