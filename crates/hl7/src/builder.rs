//! Builds an [`OruMessage`] from tokenized segments.
//!
//! Segments are consumed in document order:
//! - MSH must be first and appear once.
//! - The first PID wins; later PIDs are ignored.
//! - Each OBR opens a new order that owns every OBX up to the next OBR.
//! - An OBX before any OBR, or an OBR before the PID, is a missing-segment error.
//! - NTE attaches to the latest observation of the current order, or to the order itself.
//! - Anything else is skipped.

use labflow_types::NonEmptyText;

use crate::model::{
    parse_decimal, Address, CodedElement, FieldWarning, Header, MessageType, Observation,
    ObservationValue, Order, OruMessage, Patient, PatientIdentifier, PersonName, ValueType,
    WarningLocation,
};
use crate::segments::{
    MshSegment, NteSegment, ObrSegment, ObxSegment, PidSegment, TypedSegment, MSH, OBR, OBX, PID,
};
use crate::timestamp::{parse_date, Hl7Timestamp};
use crate::tokenizer::TokenizedMessage;
use crate::{Hl7Error, Hl7Result};

/// Assemble the message model.
///
/// # Errors
///
/// - [`Hl7Error::MalformedMessage`] if the first segment is not MSH, MSH repeats, or a
///   recognised segment is shorter than its minimum field count.
/// - [`Hl7Error::MissingRequiredSegment`] if an order precedes the patient, an observation
///   precedes any order, or the finished message lacks a patient, an order, or an observation.
pub fn build_message(tokens: &TokenizedMessage) -> Hl7Result<OruMessage> {
    let mut builder = MessageBuilder::new(tokens);
    for segment in &tokens.segments {
        builder.accept(segment)?;
    }
    builder.finish()
}

struct MessageBuilder<'t> {
    tokens: &'t TokenizedMessage,
    header: Option<Header>,
    patient: Option<Patient>,
    orders: Vec<Order>,
    warnings: Vec<FieldWarning>,
}

impl<'t> MessageBuilder<'t> {
    fn new(tokens: &'t TokenizedMessage) -> Self {
        Self {
            tokens,
            header: None,
            patient: None,
            orders: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn accept(&mut self, segment: &crate::tokenizer::Segment) -> Hl7Result<()> {
        let index = segment.index();

        if self.header.is_none() && segment.id() != MSH {
            return Err(Hl7Error::MalformedMessage {
                segment_index: index,
                reason: format!("header segment must come first, found {}", segment.id()),
            });
        }

        match TypedSegment::classify(segment)? {
            TypedSegment::Header(msh) => {
                if self.header.is_some() {
                    return Err(Hl7Error::MalformedMessage {
                        segment_index: index,
                        reason: "header segment appears more than once".into(),
                    });
                }
                self.header = Some(self.header(msh, index));
            }
            TypedSegment::Patient(pid) => {
                if self.patient.is_some() {
                    tracing::debug!("ignoring repeated PID at segment {}", index);
                } else {
                    self.patient = Some(self.patient(pid, index));
                }
            }
            TypedSegment::Order(obr) => {
                if self.patient.is_none() {
                    return Err(Hl7Error::MissingRequiredSegment {
                        segment: PID,
                        segment_index: index,
                        detail: "order segment appears before any patient segment".into(),
                    });
                }
                let order = self.order(obr, index);
                self.orders.push(order);
            }
            TypedSegment::Observation(obx) => {
                let Some(order_index) = self.orders.len().checked_sub(1) else {
                    return Err(Hl7Error::MissingRequiredSegment {
                        segment: OBR,
                        segment_index: index,
                        detail: "observation segment appears before any order segment".into(),
                    });
                };
                let observation_index = self.orders[order_index].observations.len();
                let observation = self.observation(obx, index, order_index, observation_index);
                self.orders[order_index].observations.push(observation);
            }
            TypedSegment::Note(nte) => self.note(nte, index),
            TypedSegment::Unrecognized(other) => {
                tracing::debug!("skipping {} segment at {}", other.id(), index);
            }
        }

        Ok(())
    }

    fn finish(self) -> Hl7Result<OruMessage> {
        let end = self.tokens.segments.len();
        let missing = |segment: &'static str, detail: &str| Hl7Error::MissingRequiredSegment {
            segment,
            segment_index: end,
            detail: detail.to_string(),
        };

        let header = self.header.ok_or_else(|| Hl7Error::MalformedMessage {
            segment_index: 0,
            reason: "message has no header segment".into(),
        })?;
        let patient = self
            .patient
            .ok_or_else(|| missing(PID, "message has no patient segment"))?;
        if self.orders.is_empty() {
            return Err(missing(OBR, "message has no order segment"));
        }
        if self.orders.iter().all(|o| o.observations.is_empty()) {
            return Err(missing(OBX, "no order in the message has an observation"));
        }

        let message = OruMessage {
            header,
            patient,
            orders: self.orders,
            warnings: self.warnings,
        };

        tracing::debug!(
            "built message {} with {} orders, {} observations, {} warnings",
            message.header.control_id,
            message.orders.len(),
            message.observation_count(),
            message.warnings.len()
        );

        Ok(message)
    }

    fn header(&mut self, msh: MshSegment<'_>, index: usize) -> Header {
        let message_type = MessageType {
            code: msh.message_code().to_string(),
            trigger_event: msh.trigger_event().to_string(),
        };
        if !message_type.is_oru_r01() {
            tracing::warn!(
                "message type {} is not ORU^R01; parsing as a result message",
                message_type
            );
        }

        Header {
            sending_application: msh.sending_application().to_string(),
            sending_facility: msh.sending_facility().to_string(),
            receiving_application: msh.receiving_application().to_string(),
            receiving_facility: msh.receiving_facility().to_string(),
            timestamp: self.timestamp(msh.timestamp(), WarningLocation::Header, index, "MSH-7"),
            message_type,
            control_id: msh.control_id().trim().to_string(),
            processing_id: msh.processing_id().to_string(),
            version_id: msh.version_id().to_string(),
            encoding: self.tokens.encoding,
        }
    }

    fn patient(&mut self, pid: PidSegment<'_>, index: usize) -> Patient {
        let identifier = pid.identifier().and_then(|id| {
            NonEmptyText::new(id.id).ok().map(|text| PatientIdentifier {
                id: text,
                assigning_authority: non_empty(id.assigning_authority),
                identifier_type: non_empty(id.identifier_type),
            })
        });

        let raw_dob = pid.date_of_birth();
        let date_of_birth = if raw_dob.trim().is_empty() {
            None
        } else {
            match parse_date(raw_dob) {
                Ok(date) => Some(date),
                Err(err) => {
                    self.warn(WarningLocation::Patient, index, "PID-7", raw_dob, err.reason);
                    None
                }
            }
        };

        let address = pid
            .address()
            .map(|field| Address {
                street: field.component(1).to_string(),
                other: field.component(2).to_string(),
                city: field.component(3).to_string(),
                state: field.component(4).to_string(),
                postal_code: field.component(5).to_string(),
                country: field.component(6).to_string(),
            })
            .unwrap_or_default();

        Patient {
            identifier,
            alternate_id: non_empty(pid.alternate_id()),
            name: PersonName {
                family: pid.family_name().to_string(),
                given: pid.given_name().to_string(),
                middle: pid.middle_name().to_string(),
            },
            date_of_birth,
            sex: non_empty(pid.sex()),
            address,
        }
    }

    fn order(&mut self, obr: ObrSegment<'_>, index: usize) -> Order {
        let location = WarningLocation::Order {
            order: self.orders.len(),
        };
        Order {
            set_id: obr.set_id().to_string(),
            placer_order_number: non_empty(obr.placer_order_number()),
            filler_order_number: non_empty(obr.filler_order_number()),
            service: CodedElement {
                code: obr.service_code().to_string(),
                text: obr.service_text().to_string(),
                coding_system: obr.service_coding_system().to_string(),
            },
            observed_at: self.timestamp(obr.observed_at(), location, index, "OBR-7"),
            notes: Vec::new(),
            observations: Vec::new(),
        }
    }

    fn observation(
        &mut self,
        obx: ObxSegment<'_>,
        index: usize,
        order: usize,
        observation: usize,
    ) -> Observation {
        let location = WarningLocation::Observation { order, observation };
        let value_type = ValueType::from_tag(obx.value_type());
        let raw = obx.value();

        let value = match (&value_type, parse_decimal(raw)) {
            (ValueType::Numeric, Some(value)) => ObservationValue::Numeric {
                raw: raw.to_string(),
                value,
            },
            (ValueType::Numeric, None) => {
                self.warn(
                    location,
                    index,
                    "OBX-5",
                    raw,
                    "declared numeric but is not a decimal number; kept as text",
                );
                ObservationValue::Text(raw.to_string())
            }
            (ValueType::Other(_), _) => {
                tracing::debug!(
                    "OBX-2 value type {} at segment {} kept as text",
                    value_type.tag(),
                    index
                );
                ObservationValue::Text(raw.to_string())
            }
            (ValueType::Text, _) => ObservationValue::Text(raw.to_string()),
        };

        Observation {
            set_id: obx.set_id().to_string(),
            value_type,
            identifier: CodedElement {
                code: obx.code().to_string(),
                text: obx.display_name().to_string(),
                coding_system: obx.coding_system().to_string(),
            },
            value,
            units: obx.units().to_string(),
            reference_range: obx.reference_range().to_string(),
            abnormal_flag: obx.abnormal_flag().to_string(),
            status: obx.result_status().to_string(),
            observed_at: self.timestamp(obx.observed_at(), location, index, "OBX-14"),
            notes: Vec::new(),
            critical: None,
        }
    }

    fn note(&mut self, nte: NteSegment<'_>, index: usize) {
        let Some(order) = self.orders.last_mut() else {
            tracing::debug!("ignoring NTE at segment {} outside any order", index);
            return;
        };
        let comment = nte.comment();
        match order.observations.last_mut() {
            Some(observation) => observation.notes.push(comment),
            None => order.notes.push(comment),
        }
    }

    fn timestamp(
        &mut self,
        raw: &str,
        location: WarningLocation,
        index: usize,
        field: &'static str,
    ) -> Option<Hl7Timestamp> {
        if raw.trim().is_empty() {
            return None;
        }
        match Hl7Timestamp::parse(raw) {
            Ok(ts) => Some(ts),
            Err(err) => {
                self.warn(location, index, field, raw, err.reason);
                None
            }
        }
    }

    fn warn(
        &mut self,
        location: WarningLocation,
        segment_index: usize,
        field: &'static str,
        value: &str,
        reason: &str,
    ) {
        let warning = FieldWarning {
            location,
            segment_index,
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!("field warning: {}", warning);
        self.warnings.push(warning);
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::tokenizer::tokenize;

    fn build(text: &str) -> Hl7Result<OruMessage> {
        build_message(&tokenize(text, None)?)
    }

    const MSH_LINE: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240715120000||ORU^R01|MSG9|P|2.5";
    const PID_LINE: &str = "PID|1||12345678^^^HOSPITAL^MR||DOE^JOHN^A||19800515|M";
    const OBR_LINE: &str = "OBR|1|ORD1|LAB1|CBC^COMPLETE BLOOD COUNT|||20240715113000";
    const OBX_LINE: &str = "OBX|1|NM|WBC^WHITE BLOOD COUNT||8.5|10*3/uL|4.5-11.0|N|||F|||20240715115500";

    fn message(lines: &[&str]) -> String {
        lines.join("\r")
    }

    #[test]
    fn builds_header_patient_and_order() {
        let msg = build(fixtures::CBC_RESULT).expect("build");

        assert_eq!(msg.header.sending_application, "LAB");
        assert_eq!(msg.header.receiving_application, "EPIC");
        assert_eq!(msg.header.control_id, "HL7CBC1");
        assert_eq!(msg.header.version_id, "2.5");
        assert!(msg.header.message_type.is_oru_r01());
        assert!(msg.header.timestamp.is_some());

        let id = msg.patient.identifier.as_ref().expect("patient id");
        assert_eq!(id.id.as_str(), "12345678");
        assert_eq!(id.assigning_authority.as_deref(), Some("HOSPITAL"));
        assert_eq!(msg.patient.name.formatted(), "JOHN A DOE");
        assert_eq!(msg.patient.date_of_birth.map(|d| d.to_string()).as_deref(), Some("1980-05-15"));
        assert_eq!(msg.patient.address.city, "BALTIMORE");
        assert_eq!(msg.patient.address.postal_code, "21201");

        assert_eq!(msg.orders.len(), 1);
        let order = &msg.orders[0];
        assert_eq!(order.order_id(), Some("ORD123456"));
        assert_eq!(order.filler_order_number.as_deref(), Some("LAB123456"));
        assert_eq!(order.service.display_name(), "COMPLETE BLOOD COUNT");
        assert_eq!(order.observations.len(), 3);
        assert!(msg.warnings.is_empty());
    }

    #[test]
    fn parses_numeric_observations() {
        let msg = build(fixtures::CBC_RESULT).expect("build");
        let wbc = &msg.orders[0].observations[0];
        assert_eq!(wbc.identifier.code, "WBC");
        assert_eq!(wbc.value.numeric(), Some(8.5));
        assert_eq!(wbc.value.raw(), "8.5");
        assert_eq!(wbc.units, "10*3/uL");
        assert_eq!(wbc.reference_range, "4.5-11.0");
        assert_eq!(wbc.status, "F");
        assert!(wbc.critical.is_none());
    }

    #[test]
    fn attributes_observations_to_the_preceding_order() {
        let msg = build(fixtures::TWO_ORDERS_WITH_NOTE).expect("build");
        assert_eq!(msg.orders.len(), 2);

        let first: Vec<&str> = msg.orders[0]
            .observations
            .iter()
            .map(|o| o.identifier.code.as_str())
            .collect();
        let second: Vec<&str> = msg.orders[1]
            .observations
            .iter()
            .map(|o| o.identifier.code.as_str())
            .collect();
        assert_eq!(first, ["WBC", "HGB"]);
        assert_eq!(second, ["NA", "K"]);
    }

    #[test]
    fn attaches_notes_to_latest_observation() {
        let msg = build(fixtures::TWO_ORDERS_WITH_NOTE).expect("build");
        let sodium = &msg.orders[1].observations[0];
        assert_eq!(sodium.notes, ["Verified by repeat analysis"]);
        assert!(msg.orders[1].observations[1].notes.is_empty());
    }

    #[test]
    fn attaches_note_before_first_observation_to_order() {
        let text = message(&[MSH_LINE, PID_LINE, OBR_LINE, "NTE|1||Fasting sample", OBX_LINE]);
        let msg = build(&text).expect("build");
        assert_eq!(msg.orders[0].notes, ["Fasting sample"]);
    }

    #[test]
    fn keeps_unparseable_numeric_as_text_with_warning() {
        let obx = "OBX|1|NM|GLU^GLUCOSE||<40|mg/dL|70-100|LL|||F|||20240715125500";
        let text = message(&[MSH_LINE, PID_LINE, OBR_LINE, OBX_LINE, obx]);
        let msg = build(&text).expect("build");

        let glucose = &msg.orders[0].observations[1];
        assert_eq!(glucose.value, ObservationValue::Text("<40".into()));
        assert_eq!(glucose.value_type, ValueType::Numeric);

        assert_eq!(msg.warnings.len(), 1);
        let warning = &msg.warnings[0];
        assert_eq!(warning.field, "OBX-5");
        assert_eq!(warning.value, "<40");
        assert_eq!(warning.segment_index, 4);
        assert_eq!(
            warning.location,
            WarningLocation::Observation {
                order: 0,
                observation: 1
            }
        );
    }

    #[test]
    fn text_values_are_not_numeric() {
        let obx = "OBX|2|ST|COMMENT^COMMENT||123|||||||F";
        let text = message(&[MSH_LINE, PID_LINE, OBR_LINE, OBX_LINE, obx]);
        let msg = build(&text).expect("build");
        let comment = &msg.orders[0].observations[1];
        assert_eq!(comment.value_type, ValueType::Text);
        assert_eq!(comment.value.numeric(), None);
        assert!(msg.warnings.is_empty());
    }

    #[test]
    fn invalid_timestamps_become_warnings() {
        let obx = "OBX|1|NM|WBC^WHITE BLOOD COUNT||8.5|10*3/uL|4.5-11.0|N|||F|||2024-07-15";
        let text = message(&[MSH_LINE, PID_LINE, OBR_LINE, obx]);
        let msg = build(&text).expect("build");
        assert!(msg.orders[0].observations[0].observed_at.is_none());
        assert_eq!(msg.warnings[0].field, "OBX-14");
    }

    #[test]
    fn first_patient_wins() {
        let second_pid = "PID|1||999^^^OTHER^MR||ROE^RICHARD";
        let text = message(&[MSH_LINE, PID_LINE, second_pid, OBR_LINE, OBX_LINE]);
        let msg = build(&text).expect("build");
        let id = msg.patient.identifier.expect("identifier");
        assert_eq!(id.id.as_str(), "12345678");
    }

    #[test]
    fn skips_unrecognized_segments() {
        let text = message(&[MSH_LINE, PID_LINE, "PV1|1|O", OBR_LINE, "ZXY|custom", OBX_LINE]);
        let msg = build(&text).expect("build");
        assert_eq!(msg.observation_count(), 1);
    }

    #[test]
    fn observation_before_order_is_missing_segment() {
        let text = message(&[MSH_LINE, PID_LINE, OBX_LINE, OBR_LINE]);
        let err = build(&text).expect_err("orphan observation");
        assert_eq!(
            err,
            Hl7Error::MissingRequiredSegment {
                segment: OBR,
                segment_index: 2,
                detail: "observation segment appears before any order segment".into(),
            }
        );
    }

    #[test]
    fn order_before_patient_is_missing_segment() {
        let text = message(&[MSH_LINE, OBR_LINE, PID_LINE, OBX_LINE]);
        let err = build(&text).expect_err("order before patient");
        assert!(matches!(
            err,
            Hl7Error::MissingRequiredSegment { segment: PID, segment_index: 1, .. }
        ));
    }

    #[test]
    fn missing_segments_are_named() {
        let err = build(&message(&[MSH_LINE, "PV1|1|O"])).expect_err("no patient");
        assert!(matches!(err, Hl7Error::MissingRequiredSegment { segment: PID, segment_index: 2, .. }));

        let err = build(&message(&[MSH_LINE, PID_LINE])).expect_err("no order");
        assert!(matches!(err, Hl7Error::MissingRequiredSegment { segment: OBR, .. }));

        let err = build(&message(&[MSH_LINE, PID_LINE, OBR_LINE])).expect_err("no observation");
        assert!(matches!(err, Hl7Error::MissingRequiredSegment { segment: OBX, .. }));
    }

    #[test]
    fn repeated_header_is_malformed() {
        let text = message(&[MSH_LINE, PID_LINE, MSH_LINE, OBR_LINE, OBX_LINE]);
        let err = build(&text).expect_err("two headers");
        assert!(matches!(err, Hl7Error::MalformedMessage { segment_index: 2, .. }));
    }

    #[test]
    fn carries_declared_encoding_into_header() {
        let text = "MSH#*!$%#LAB#HOSP#EPIC#HOSP#20240715120000##ORU*R01#M1#P#2.5\r\
                    PID#1##123*A\r\
                    OBR#1#ORD1##CBC*COUNT\r\
                    OBX#1#NM#WBC*WHITE#x#8.5";
        let msg = build(text).expect("build");
        assert_eq!(msg.header.encoding.component, '*');
        assert_eq!(msg.orders[0].observations[0].value.numeric(), Some(8.5));
    }
}
