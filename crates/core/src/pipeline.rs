//! Per-message processing: tokenize, build, evaluate, then render on demand.
//!
//! Every function here is synchronous and holds no state between calls; the only shared input is
//! the read-only [`ThresholdConfig`], so callers may process many messages in parallel.

use chrono::{DateTime, Utc};

use crate::alert::CriticalAlert;
use crate::config::ThresholdConfig;
use crate::critical::{evaluate, EvaluatedMessage};
use crate::emr::{EmrDocument, EmrTarget};
use crate::{ProcessingError, TransformResult};

/// Parse one raw message and evaluate it for critical values.
///
/// # Errors
///
/// Returns [`ProcessingError`] carrying the raw text if the message cannot be tokenized or
/// lacks a required segment. Field-level problems do not fail the message; they are available
/// from [`EvaluatedMessage::warnings`].
pub fn process_message(
    raw: &str,
    config: &ThresholdConfig,
) -> Result<EvaluatedMessage, ProcessingError> {
    let message = hl7::parse_message(raw).map_err(|e| ProcessingError::new(e, raw))?;

    tracing::debug!(
        "parsed message {} ({} orders)",
        message.header.control_id,
        message.orders.len()
    );

    Ok(evaluate(message, config))
}

impl EvaluatedMessage {
    /// Render the message for one downstream system.
    pub fn render(&self, target: EmrTarget) -> TransformResult<EmrDocument> {
        target.transform(self)
    }

    /// The alert record for this message, or `None` if nothing was critical.
    pub fn critical_alert(&self, issued_at: DateTime<Utc>) -> Option<CriticalAlert> {
        CriticalAlert::from_alerts(self.message(), self.alerts(), issued_at)
    }
}
