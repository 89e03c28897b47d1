//! Downstream EMR document transformers.
//!
//! Each transformer is a pure mapping from an evaluated message to one target's JSON shape. The
//! target is always chosen explicitly by the caller through [`EmrTarget`]; nothing is detected
//! from the message. Fields a target cannot do without are required through the helpers in this
//! module so that both targets fail the same way instead of inventing placeholders.

pub mod cerner;
pub mod epic;

use std::fmt;
use std::str::FromStr;

use hl7::{Hl7Timestamp, Observation, Order, OruMessage};
use serde::Serialize;

use crate::critical::{AlertEntry, EvaluatedMessage};
use crate::{CoreError, TransformError, TransformResult};

pub use cerner::{CernerDocument, CernerEvent, CernerTransformer};
pub use epic::{EpicDocument, EpicOrder, EpicResult, EpicTransformer};

/// Selects the downstream document shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmrTarget {
    Epic,
    Cerner,
}

impl EmrTarget {
    pub const ALL: [EmrTarget; 2] = [EmrTarget::Epic, EmrTarget::Cerner];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmrTarget::Epic => "epic",
            EmrTarget::Cerner => "cerner",
        }
    }

    /// Run this target's transformer.
    pub fn transform(&self, evaluated: &EvaluatedMessage) -> TransformResult<EmrDocument> {
        let message = evaluated.message();
        let alerts = evaluated.alerts();
        match self {
            EmrTarget::Epic => EpicTransformer
                .transform(message, alerts)
                .map(EmrDocument::Epic),
            EmrTarget::Cerner => CernerTransformer
                .transform(message, alerts)
                .map(EmrDocument::Cerner),
        }
    }
}

impl fmt::Display for EmrTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmrTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epic" => Ok(EmrTarget::Epic),
            "cerner" => Ok(EmrTarget::Cerner),
            _ => Err(CoreError::UnknownTarget(s.to_string())),
        }
    }
}

/// A rendered document for either target. Serializes as the bare target shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmrDocument {
    Epic(EpicDocument),
    Cerner(CernerDocument),
}

impl EmrDocument {
    pub fn target(&self) -> EmrTarget {
        match self {
            EmrDocument::Epic(_) => EmrTarget::Epic,
            EmrDocument::Cerner(_) => EmrTarget::Cerner,
        }
    }
}

/// A pure mapping from an evaluated message to one target's document.
pub trait EmrTransformer {
    type Document: Serialize;

    const TARGET: EmrTarget;

    /// # Errors
    ///
    /// Returns [`TransformError`] if a field the target cannot do without is absent, or if the
    /// message has not been evaluated.
    fn transform(
        &self,
        message: &OruMessage,
        alerts: &[AlertEntry],
    ) -> TransformResult<Self::Document>;
}

// ============================================================================
// Required fields
// ============================================================================

/// Accessors shared by both transformers; every failure names the missing field.
pub(crate) struct Required {
    target: EmrTarget,
}

impl Required {
    pub(crate) fn new(target: EmrTarget) -> Self {
        Self { target }
    }

    fn missing(&self, field: &'static str, detail: impl Into<String>) -> TransformError {
        TransformError::MissingField {
            target: self.target,
            field,
            detail: detail.into(),
        }
    }

    pub(crate) fn evaluated(&self, message: &OruMessage) -> TransformResult<()> {
        if message.is_evaluated() {
            Ok(())
        } else {
            Err(TransformError::NotEvaluated {
                target: self.target,
            })
        }
    }

    pub(crate) fn patient_id<'m>(&self, message: &'m OruMessage) -> TransformResult<&'m str> {
        message
            .patient
            .identifier
            .as_ref()
            .map(|id| id.id.as_str())
            .ok_or_else(|| self.missing("patient identifier", "PID-3 is empty"))
    }

    pub(crate) fn patient_name(&self, message: &OruMessage) -> TransformResult<String> {
        let name = &message.patient.name;
        if name.is_empty() {
            return Err(self.missing("patient name", "PID-5 has no name components"));
        }
        Ok(name.formatted())
    }

    pub(crate) fn message_id<'m>(&self, message: &'m OruMessage) -> TransformResult<&'m str> {
        let id = message.header.control_id.as_str();
        if id.is_empty() {
            return Err(self.missing("message control id", "MSH-10 is empty"));
        }
        Ok(id)
    }

    pub(crate) fn order_id<'m>(
        &self,
        order: &'m Order,
        order_index: usize,
    ) -> TransformResult<&'m str> {
        order.order_id().ok_or_else(|| {
            self.missing(
                "order id",
                format!("order {order_index} has neither OBR-2 nor OBR-3"),
            )
        })
    }

    pub(crate) fn observation_code<'m>(
        &self,
        observation: &'m Observation,
        order_index: usize,
        observation_index: usize,
    ) -> TransformResult<&'m str> {
        let code = observation.identifier.code.as_str();
        if code.trim().is_empty() {
            return Err(self.missing(
                "observation code",
                format!("observation {order_index}.{observation_index} has an empty OBX-3"),
            ));
        }
        Ok(code)
    }

    pub(crate) fn critical(&self, observation: &Observation) -> TransformResult<bool> {
        observation.critical.ok_or(TransformError::NotEvaluated {
            target: self.target,
        })
    }
}

/// OBX-14, inheriting OBR-7 when the observation carries no time of its own.
pub(crate) fn result_date<'m>(
    observation: &'m Observation,
    order: &'m Order,
) -> Option<&'m Hl7Timestamp> {
    observation
        .observed_at
        .as_ref()
        .or(order.observed_at.as_ref())
}
