//! Cerner-style clinical event document.
//!
//! There is no published contract for this shape. It follows Millennium clinical event naming:
//! one flat event per observation in document order, each carrying its order's identifiers,
//! `_ind` indicators as 0/1 and millisecond-precision `_dt_tm` dates. Changes to the layout stay
//! inside this module.

use hl7::{Observation, OruMessage};
use serde::Serialize;

use super::{result_date, EmrTarget, EmrTransformer, Required};
use crate::constants::{CERNER_BIRTH_DATE_FORMAT, CERNER_DATE_FORMAT};
use crate::critical::AlertEntry;
use crate::TransformResult;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CernerDocument {
    pub person_id: String,
    pub person_name: String,
    pub birth_dt_tm: Option<String>,
    pub sex: Option<String>,
    pub message_id: String,
    pub critical_event_count: usize,
    pub clinical_events: Vec<CernerEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CernerEvent {
    pub order_id: String,
    pub accession_nbr: Option<String>,
    pub order_mnemonic: String,
    pub event_code: String,
    pub event_title: String,
    pub result_val: String,
    pub result_units: String,
    pub normal_range: String,
    pub abnormal_ind: u8,
    pub critical_ind: u8,
    pub result_status: String,
    pub event_end_dt_tm: Option<String>,
}

pub struct CernerTransformer;

impl EmrTransformer for CernerTransformer {
    type Document = CernerDocument;

    const TARGET: EmrTarget = EmrTarget::Cerner;

    fn transform(
        &self,
        message: &OruMessage,
        alerts: &[AlertEntry],
    ) -> TransformResult<CernerDocument> {
        let required = Required::new(Self::TARGET);
        required.evaluated(message)?;

        let mut clinical_events = Vec::with_capacity(message.observation_count());
        for (order_index, order) in message.orders.iter().enumerate() {
            let order_id = required.order_id(order, order_index)?;
            for (observation_index, observation) in order.observations.iter().enumerate() {
                let event_code =
                    required.observation_code(observation, order_index, observation_index)?;
                clinical_events.push(CernerEvent {
                    order_id: order_id.to_string(),
                    accession_nbr: order.filler_order_number.clone(),
                    order_mnemonic: order.service.code.clone(),
                    event_code: event_code.to_string(),
                    event_title: observation.identifier.display_name().to_string(),
                    result_val: observation.value.raw().to_string(),
                    result_units: observation.units.clone(),
                    normal_range: observation.reference_range.clone(),
                    abnormal_ind: abnormal_indicator(observation),
                    critical_ind: u8::from(required.critical(observation)?),
                    result_status: observation.status.clone(),
                    event_end_dt_tm: result_date(observation, order)
                        .map(|ts| ts.render(CERNER_DATE_FORMAT)),
                });
            }
        }

        let patient = &message.patient;
        Ok(CernerDocument {
            person_id: required.patient_id(message)?.to_string(),
            person_name: required.patient_name(message)?,
            birth_dt_tm: patient
                .date_of_birth
                .map(|dob| dob.format(CERNER_BIRTH_DATE_FORMAT).to_string()),
            sex: patient.sex.clone(),
            message_id: required.message_id(message)?.to_string(),
            critical_event_count: alerts.len(),
            clinical_events,
        })
    }
}

/// 1 when the sender flagged the result as anything other than normal.
fn abnormal_indicator(observation: &Observation) -> u8 {
    let flag = observation.abnormal_flag.trim();
    u8::from(!flag.is_empty() && !flag.eq_ignore_ascii_case("N"))
}
