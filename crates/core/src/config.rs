//! Critical threshold configuration.
//!
//! A [`ThresholdConfig`] is resolved once at process startup and then shared by reference with
//! every evaluation. Nothing in this module reads environment variables; binaries decide where
//! the configuration comes from and pass the path in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use labflow_types::TestKey;
use serde::{Deserialize, Serialize};

use crate::constants::CLINICAL_DEFAULT_THRESHOLDS;
use crate::{CoreError, CoreResult};

// ============================================================================
// Threshold
// ============================================================================

/// Inclusive safe range for one test; values strictly outside it are critical.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    low: f64,
    high: f64,
    unit: Option<String>,
}

impl Threshold {
    /// Create a threshold, rejecting non-finite bounds and `low > high`.
    pub fn new(low: f64, high: f64, unit: Option<&str>) -> CoreResult<Self> {
        if !low.is_finite() || !high.is_finite() {
            return Err(CoreError::InvalidThresholds(format!(
                "bounds must be finite numbers (low={low}, high={high})"
            )));
        }
        if low > high {
            return Err(CoreError::InvalidThresholds(format!(
                "low bound {low} is greater than high bound {high}"
            )));
        }

        let unit = unit.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string);
        Ok(Self { low, high, unit })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// `true` when `value` lies strictly below `low` or strictly above `high`.
    pub fn is_critical(&self, value: f64) -> bool {
        value < self.low || value > self.high
    }
}

// ============================================================================
// ThresholdConfig
// ============================================================================

/// Immutable mapping from normalized test identifier to its critical limits.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdConfig {
    thresholds: BTreeMap<TestKey, Threshold>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::clinical_defaults()
    }
}

impl ThresholdConfig {
    /// Build a configuration from `(identifier, threshold)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidThresholds`] if an identifier is blank or two identifiers
    /// normalize to the same key.
    pub fn new<K, I>(entries: I) -> CoreResult<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Threshold)>,
    {
        let mut thresholds = BTreeMap::new();
        for (raw_key, threshold) in entries {
            let raw_key = raw_key.as_ref();
            let key = TestKey::new(raw_key).map_err(|_| {
                CoreError::InvalidThresholds("test identifier cannot be empty".into())
            })?;
            if thresholds.contains_key(&key) {
                return Err(CoreError::InvalidThresholds(format!(
                    "test identifier `{raw_key}` is configured more than once (as {key})"
                )));
            }
            thresholds.insert(key, threshold);
        }
        Ok(Self { thresholds })
    }

    /// The standard adult critical limits for common chemistry, haematology and blood gas tests.
    pub fn clinical_defaults() -> Self {
        let thresholds = CLINICAL_DEFAULT_THRESHOLDS
            .iter()
            .filter_map(|&(key, low, high, unit)| {
                let key = TestKey::new(key).ok()?;
                let unit = unit.map(str::to_string);
                Some((key, Threshold { low, high, unit }))
            })
            .collect();
        Self { thresholds }
    }

    /// Look up an identifier (observation code or display name) after normalizing it.
    pub fn get(&self, identifier: &str) -> Option<&Threshold> {
        let key = TestKey::new(identifier).ok()?;
        self.thresholds.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TestKey, &Threshold)> {
        self.thresholds.iter()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Parse a configuration from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `thresholds.GLU.low`)
    /// to the failing field when the YAML does not match the expected layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidThresholds`] if:
    /// - the YAML does not match the layout or contains unknown keys,
    /// - any bound is non-finite or `low > high`,
    /// - an identifier is empty or duplicates another after normalization.
    pub fn from_yaml(yaml_text: &str) -> CoreResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, ThresholdFileWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CoreError::InvalidThresholds(format!(
                    "threshold file schema mismatch at {path}: {source}"
                )));
            }
        };

        let entries = wire
            .thresholds
            .into_iter()
            .map(|(key, t)| {
                let threshold = Threshold::new(t.low, t.high, t.unit.as_deref()).map_err(|e| {
                    CoreError::InvalidThresholds(format!("{}: {e}", key.trim()))
                })?;
                Ok((key, threshold))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Self::new(entries)
    }

    /// Read and parse a YAML threshold file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ThresholdFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Render the configuration in the same YAML layout accepted by [`Self::from_yaml`].
    pub fn to_yaml(&self) -> CoreResult<String> {
        let wire = ThresholdFileWire {
            thresholds: self
                .thresholds
                .iter()
                .map(|(key, t)| {
                    (
                        key.as_str().to_string(),
                        ThresholdWire {
                            low: t.low,
                            high: t.high,
                            unit: t.unit.clone(),
                        },
                    )
                })
                .collect(),
        };
        serde_yaml::to_string(&wire).map_err(CoreError::YamlSerialization)
    }
}

/// Resolve the threshold configuration without reading environment variables.
///
/// If `override_path` is provided the file must exist and parse cleanly; there is no silent
/// fallback to the defaults. Otherwise the clinical defaults are returned.
pub fn resolve_threshold_config(override_path: Option<PathBuf>) -> CoreResult<ThresholdConfig> {
    match override_path {
        Some(path) => {
            let config = ThresholdConfig::from_file(&path)?;
            tracing::debug!(
                "loaded {} thresholds from {}",
                config.len(),
                path.display()
            );
            Ok(config)
        }
        None => Ok(ThresholdConfig::clinical_defaults()),
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdFileWire {
    thresholds: BTreeMap<String, ThresholdWire>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdWire {
    low: f64,
    high: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn clinical_defaults_cover_standard_tests() {
        let config = ThresholdConfig::clinical_defaults();
        assert_eq!(config.len(), 9);

        let glucose = config.get("GLU").expect("glucose threshold");
        assert_eq!(glucose.low(), 50.0);
        assert_eq!(glucose.high(), 400.0);
        assert_eq!(glucose.unit(), Some("mg/dL"));

        let ph = config.get("pH").expect("pH threshold");
        assert_eq!(ph.unit(), None);
        assert!(config.get("pco2").is_some());
    }

    #[test]
    fn lookup_normalizes_identifier() {
        let config = ThresholdConfig::clinical_defaults();
        assert!(config.get("  k ").is_some());
        assert!(config.get("").is_none());
        assert!(config.get("LDL").is_none());
    }

    #[test]
    fn threshold_bounds_are_exclusive() {
        let t = Threshold::new(50.0, 400.0, Some("mg/dL")).expect("valid threshold");
        assert!(!t.is_critical(50.0));
        assert!(!t.is_critical(400.0));
        assert!(t.is_critical(49.999));
        assert!(t.is_critical(400.001));
    }

    #[test]
    fn threshold_rejects_inverted_and_non_finite_bounds() {
        assert!(matches!(
            Threshold::new(10.0, 1.0, None),
            Err(CoreError::InvalidThresholds(_))
        ));
        assert!(matches!(
            Threshold::new(f64::NAN, 1.0, None),
            Err(CoreError::InvalidThresholds(_))
        ));
        assert!(matches!(
            Threshold::new(0.0, f64::INFINITY, None),
            Err(CoreError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn parses_yaml_with_optional_units() {
        let yaml = "thresholds:\n  glu: { low: 40, high: 450, unit: mg/dL }\n  PH: { low: 7.1, high: 7.7 }\n";
        let config = ThresholdConfig::from_yaml(yaml).expect("parse yaml");
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("GLU").map(Threshold::low), Some(40.0));
        assert_eq!(config.get("ph").and_then(Threshold::unit), None);
    }

    #[test]
    fn yaml_duplicate_after_normalization_is_rejected() {
        let yaml = "thresholds:\n  glu: { low: 40, high: 450 }\n  GLU: { low: 50, high: 400 }\n";
        let err = ThresholdConfig::from_yaml(yaml).expect_err("duplicate key");
        assert!(matches!(err, CoreError::InvalidThresholds(msg) if msg.contains("more than once")));
    }

    #[test]
    fn yaml_unknown_field_reports_path() {
        let yaml = "thresholds:\n  GLU: { low: 40, high: 450, critical: true }\n";
        let err = ThresholdConfig::from_yaml(yaml).expect_err("unknown field");
        assert!(matches!(err, CoreError::InvalidThresholds(msg) if msg.contains("thresholds.GLU")));
    }

    #[test]
    fn yaml_inverted_bounds_name_the_test() {
        let yaml = "thresholds:\n  K: { low: 6.5, high: 2.5 }\n";
        let err = ThresholdConfig::from_yaml(yaml).expect_err("inverted");
        assert!(matches!(err, CoreError::InvalidThresholds(msg) if msg.starts_with("K:")));
    }

    #[test]
    fn yaml_blank_key_is_rejected() {
        let yaml = "thresholds:\n  \"  \": { low: 1, high: 2 }\n";
        let err = ThresholdConfig::from_yaml(yaml).expect_err("blank key");
        assert!(matches!(err, CoreError::InvalidThresholds(_)));
    }

    #[test]
    fn yaml_output_parses_back_to_same_config() {
        let config = ThresholdConfig::clinical_defaults();
        let yaml = config.to_yaml().expect("render yaml");
        assert!(yaml.contains("GLU"));
        let reparsed = ThresholdConfig::from_yaml(&yaml).expect("reparse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn resolve_without_override_uses_defaults() {
        let config = resolve_threshold_config(None).expect("defaults");
        assert_eq!(config, ThresholdConfig::clinical_defaults());
    }

    #[test]
    fn resolve_reads_override_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "thresholds:\n  TROP: {{ low: 0, high: 0.04, unit: ng/mL }}")
            .expect("write yaml");

        let config =
            resolve_threshold_config(Some(file.path().to_path_buf())).expect("load override");
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("trop").map(Threshold::high), Some(0.04));
    }

    #[test]
    fn resolve_missing_override_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.yaml");
        let err = resolve_threshold_config(Some(missing)).expect_err("missing file");
        assert!(matches!(err, CoreError::ThresholdFileRead { .. }));
    }
}
