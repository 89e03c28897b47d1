//! Constants used throughout the labflow core crate.

/// Environment variable naming a YAML threshold file; read by binaries only.
pub const THRESHOLDS_FILE_ENV: &str = "LABFLOW_THRESHOLDS_FILE";

/// `alert_type` of every critical alert record.
pub const CRITICAL_ALERT_TYPE: &str = "CRITICAL_LAB_VALUE";

/// Epic result dates, second precision.
pub const EPIC_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Cerner event dates, millisecond precision.
pub const CERNER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Cerner birth dates.
pub const CERNER_BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Clinical default critical limits: test key, low, high, unit.
pub const CLINICAL_DEFAULT_THRESHOLDS: &[(&str, f64, f64, Option<&str>)] = &[
    ("GLU", 50.0, 400.0, Some("mg/dL")),
    ("K", 2.5, 6.5, Some("mmol/L")),
    ("NA", 120.0, 160.0, Some("mmol/L")),
    ("HGB", 7.0, 20.0, Some("g/dL")),
    ("PLT", 50.0, 1000.0, Some("10*3/uL")),
    ("WBC", 2.0, 50.0, Some("10*3/uL")),
    ("PH", 7.2, 7.6, None),
    ("PCO2", 20.0, 60.0, Some("mmHg")),
    ("PO2", 60.0, 100.0, Some("mmHg")),
];
