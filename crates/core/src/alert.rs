//! Critical alert record sent to the notification path.

use chrono::{DateTime, SecondsFormat, Utc};
use hl7::OruMessage;
use serde::Serialize;

use crate::constants::CRITICAL_ALERT_TYPE;
use crate::critical::AlertEntry;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriticalAlert {
    pub alert_type: &'static str,
    /// RFC 3339 issue time.
    pub timestamp: String,
    /// `null` when the message carried no PID-3; an alert is never held back for it.
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub critical_values: Vec<CriticalValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CriticalValue {
    pub test: String,
    pub value: String,
    pub unit: String,
    /// The observation's reference range as sent.
    pub reference: String,
}

impl From<&AlertEntry> for CriticalValue {
    fn from(entry: &AlertEntry) -> Self {
        Self {
            test: entry.test.clone(),
            value: entry.value.clone(),
            unit: entry.unit.clone(),
            reference: entry.reference.clone(),
        }
    }
}

impl CriticalAlert {
    /// Build the alert for a message, or `None` when nothing was critical.
    pub fn from_alerts(
        message: &OruMessage,
        alerts: &[AlertEntry],
        issued_at: DateTime<Utc>,
    ) -> Option<Self> {
        if alerts.is_empty() {
            return None;
        }

        Some(Self {
            alert_type: CRITICAL_ALERT_TYPE,
            timestamp: issued_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            patient_id: message
                .patient
                .identifier
                .as_ref()
                .map(|id| id.id.as_str().to_string()),
            patient_name: message.patient.name.formatted(),
            critical_values: alerts.iter().map(CriticalValue::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;
    use crate::critical::evaluate;
    use crate::fixtures;
    use chrono::TimeZone;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 13, 0, 5)
            .single()
            .expect("valid time")
    }

    #[test]
    fn builds_alert_for_critical_message() {
        let msg = hl7::parse_message(fixtures::CRITICAL_CHEM).expect("parse");
        let evaluated = evaluate(msg, &ThresholdConfig::clinical_defaults());
        let alert = CriticalAlert::from_alerts(evaluated.message(), evaluated.alerts(), issued_at())
            .expect("alert");

        assert_eq!(alert.alert_type, "CRITICAL_LAB_VALUE");
        assert_eq!(alert.timestamp, "2024-07-15T13:00:05Z");
        assert_eq!(alert.patient_id.as_deref(), Some("98765432"));
        assert_eq!(alert.patient_name, "JANE B SMITH");
        assert_eq!(
            alert.critical_values[0],
            CriticalValue {
                test: "GLUCOSE".into(),
                value: "32".into(),
                unit: "mg/dL".into(),
                reference: "70-100".into(),
            }
        );
        assert_eq!(alert.critical_values[1].test, "POTASSIUM");
    }

    #[test]
    fn no_alert_without_critical_values() {
        let msg = hl7::parse_message(fixtures::NORMAL_CBC).expect("parse");
        let evaluated = evaluate(msg, &ThresholdConfig::clinical_defaults());
        assert!(
            CriticalAlert::from_alerts(evaluated.message(), evaluated.alerts(), issued_at())
                .is_none()
        );
    }

    #[test]
    fn missing_patient_id_serializes_as_null() {
        let raw = fixtures::CRITICAL_CHEM.replace("98765432^^^HOSPITAL^MR", "");
        let msg = hl7::parse_message(&raw).expect("parse");
        let evaluated = evaluate(msg, &ThresholdConfig::clinical_defaults());
        let alert = CriticalAlert::from_alerts(evaluated.message(), evaluated.alerts(), issued_at())
            .expect("alert");

        let json = serde_json::to_value(&alert).expect("serialize");
        assert!(json["patient_id"].is_null());
        assert_eq!(json["critical_values"].as_array().map(Vec::len), Some(2));
    }
}
