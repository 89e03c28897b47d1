//! # Labflow Core
//!
//! Critical value evaluation and downstream rendering for parsed lab result messages.
//!
//! This crate builds on the `hl7` message model:
//! - threshold configuration resolved once at startup
//! - critical value evaluation and the alert list it produces
//! - Epic-style and Cerner-style document transformers
//! - the critical alert record
//!
//! **No I/O concerns**: reading message files, batching and output belong in the `labflow` CLI.
//! The only file access here is loading a threshold file at startup.

pub mod alert;
pub mod config;
pub mod constants;
pub mod critical;
pub mod emr;
pub mod error;
pub mod pipeline;

#[cfg(test)]
mod fixtures;

pub use alert::{CriticalAlert, CriticalValue};
pub use config::{resolve_threshold_config, Threshold, ThresholdConfig};
pub use critical::{evaluate, AlertEntry, EvaluatedMessage};
pub use emr::{EmrDocument, EmrTarget, EmrTransformer};
pub use error::{CoreError, CoreResult, ProcessingError, TransformError, TransformResult};
pub use pipeline::process_message;
