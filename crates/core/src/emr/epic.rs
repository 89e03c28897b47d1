//! Epic-style result document.
//!
//! Orders nest their results; keys are PascalCase and dates carry second precision.

use hl7::OruMessage;
use serde::Serialize;

use super::{result_date, EmrTarget, EmrTransformer, Required};
use crate::constants::EPIC_DATE_FORMAT;
use crate::critical::AlertEntry;
use crate::TransformResult;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpicDocument {
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    pub patient_name: String,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    pub orders: Vec<EpicOrder>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpicOrder {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    pub test_name: String,
    pub results: Vec<EpicResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpicResult {
    #[serde(rename = "ComponentID")]
    pub component_id: String,
    pub component_name: String,
    pub value: String,
    pub units: String,
    pub reference_range: String,
    pub abnormal_flag: String,
    pub status: String,
    pub result_date: Option<String>,
    pub is_critical: bool,
}

pub struct EpicTransformer;

impl EmrTransformer for EpicTransformer {
    type Document = EpicDocument;

    const TARGET: EmrTarget = EmrTarget::Epic;

    fn transform(
        &self,
        message: &OruMessage,
        _alerts: &[AlertEntry],
    ) -> TransformResult<EpicDocument> {
        let required = Required::new(Self::TARGET);
        required.evaluated(message)?;

        let mut orders = Vec::with_capacity(message.orders.len());
        for (order_index, order) in message.orders.iter().enumerate() {
            let mut results = Vec::with_capacity(order.observations.len());
            for (observation_index, observation) in order.observations.iter().enumerate() {
                results.push(EpicResult {
                    component_id: required
                        .observation_code(observation, order_index, observation_index)?
                        .to_string(),
                    component_name: observation.identifier.display_name().to_string(),
                    value: observation.value.raw().to_string(),
                    units: observation.units.clone(),
                    reference_range: observation.reference_range.clone(),
                    abnormal_flag: observation.abnormal_flag.clone(),
                    status: observation.status.clone(),
                    result_date: result_date(observation, order)
                        .map(|ts| ts.render(EPIC_DATE_FORMAT)),
                    is_critical: required.critical(observation)?,
                });
            }

            orders.push(EpicOrder {
                order_id: required.order_id(order, order_index)?.to_string(),
                test_name: order.service.display_name().to_string(),
                results,
            });
        }

        Ok(EpicDocument {
            patient_id: required.patient_id(message)?.to_string(),
            patient_name: required.patient_name(message)?,
            message_id: required.message_id(message)?.to_string(),
            orders,
        })
    }
}
