//! Critical value evaluation.
//!
//! Every numeric observation is looked up in the [`ThresholdConfig`] (by code, then by display
//! name) and flagged when its value lies outside the configured limits. Text values and tests
//! without a threshold are never critical. Raw values, units and reference ranges are not
//! touched; only [`Observation::critical`] is written.

use hl7::{FieldWarning, Observation, OruMessage};

use crate::config::{Threshold, ThresholdConfig};

/// One observation found critical, in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertEntry {
    /// Display name when present, otherwise the observation code.
    pub test: String,
    pub code: String,
    /// The value exactly as sent.
    pub value: String,
    /// Observation units, otherwise the threshold's configured unit.
    pub unit: String,
    /// The observation's own reference range, not the threshold bounds.
    pub reference: String,
    pub order: usize,
    pub observation: usize,
}

/// A message whose observations carry their critical flags, plus the alerts they produced.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedMessage {
    message: OruMessage,
    alerts: Vec<AlertEntry>,
}

impl EvaluatedMessage {
    pub fn message(&self) -> &OruMessage {
        &self.message
    }

    pub fn alerts(&self) -> &[AlertEntry] {
        &self.alerts
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        &self.message.warnings
    }

    pub fn has_critical(&self) -> bool {
        !self.alerts.is_empty()
    }

    pub fn critical_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn into_parts(self) -> (OruMessage, Vec<AlertEntry>) {
        (self.message, self.alerts)
    }
}

/// Find the threshold for an observation: code first, then display name.
pub fn threshold_for<'c>(
    observation: &Observation,
    config: &'c ThresholdConfig,
) -> Option<&'c Threshold> {
    config
        .get(&observation.identifier.code)
        .or_else(|| config.get(&observation.identifier.text))
}

/// Whether a single observation is critical under `config`.
pub fn is_critical(observation: &Observation, config: &ThresholdConfig) -> bool {
    match (observation.value.numeric(), threshold_for(observation, config)) {
        (Some(value), Some(threshold)) => threshold.is_critical(value),
        _ => false,
    }
}

/// Annotate every observation with its critical flag and collect the alert list.
///
/// Flags are always recomputed, so evaluating an already evaluated message against a different
/// configuration replaces the previous result.
pub fn evaluate(mut message: OruMessage, config: &ThresholdConfig) -> EvaluatedMessage {
    let mut alerts = Vec::new();

    for (order_index, order) in message.orders.iter_mut().enumerate() {
        for (observation_index, observation) in order.observations.iter_mut().enumerate() {
            let critical = is_critical(observation, config);
            observation.critical = Some(critical);

            let Some(threshold) = threshold_for(observation, config) else {
                continue;
            };
            check_units(observation, threshold);

            if critical {
                let alert = alert_entry(observation, threshold, order_index, observation_index);
                tracing::warn!(
                    "critical value {} = {} {} (reference {}, limits {}-{})",
                    alert.test,
                    alert.value,
                    alert.unit,
                    alert.reference,
                    threshold.low(),
                    threshold.high()
                );
                alerts.push(alert);
            }
        }
    }

    tracing::debug!(
        "evaluated message {}: {} observations, {} critical",
        message.header.control_id,
        message.observation_count(),
        alerts.len()
    );

    EvaluatedMessage { message, alerts }
}

fn check_units(observation: &Observation, threshold: &Threshold) {
    let units = observation.units.trim();
    if let Some(expected) = threshold.unit() {
        if !units.is_empty() && !units.eq_ignore_ascii_case(expected) {
            tracing::warn!(
                "unit mismatch for {}: result in {}, threshold in {}",
                observation.identifier.code,
                units,
                expected
            );
        }
    }
}

fn alert_entry(
    observation: &Observation,
    threshold: &Threshold,
    order: usize,
    index: usize,
) -> AlertEntry {
    let unit = if observation.units.trim().is_empty() {
        threshold.unit().unwrap_or_default().to_string()
    } else {
        observation.units.clone()
    };

    AlertEntry {
        test: observation.identifier.display_name().to_string(),
        code: observation.identifier.code.clone(),
        value: observation.value.raw().to_string(),
        unit,
        reference: observation.reference_range.clone(),
        order,
        observation: index,
    }
}
