use std::path::PathBuf;

use hl7::Hl7Error;

use crate::emr::EmrTarget;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid threshold configuration: {0}")]
    InvalidThresholds(String),
    #[error("failed to read threshold file {path}: {source}", path = path.display())]
    ThresholdFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("unknown EMR target `{0}` (expected `epic` or `cerner`)")]
    UnknownTarget(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// A transformer could not produce its document from an otherwise valid message.
///
/// Only the failing transform call is affected; the evaluated message and its alerts stay usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("{target} transform requires {field}: {detail}")]
    MissingField {
        target: EmrTarget,
        field: &'static str,
        detail: String,
    },
    #[error("{target} transform requires a message evaluated for critical values")]
    NotEvaluated { target: EmrTarget },
}

pub type TransformResult<T> = std::result::Result<T, TransformError>;

/// A message that could not be parsed, together with the text that was submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to process message: {source}")]
pub struct ProcessingError {
    pub source: Hl7Error,
    pub raw_message: String,
}

impl ProcessingError {
    pub fn new(source: Hl7Error, raw_message: impl Into<String>) -> Self {
        Self {
            source,
            raw_message: raw_message.into(),
        }
    }

    /// Segment position (0-based) where parsing stopped, if the failure was structural.
    pub fn segment_index(&self) -> Option<usize> {
        match &self.source {
            Hl7Error::MalformedMessage { segment_index, .. }
            | Hl7Error::MissingRequiredSegment { segment_index, .. } => Some(*segment_index),
            Hl7Error::EncodingMismatch { .. } => None,
        }
    }

    /// Byte offset into the raw text, for encoding failures.
    pub fn offset(&self) -> Option<usize> {
        match &self.source {
            Hl7Error::EncodingMismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
