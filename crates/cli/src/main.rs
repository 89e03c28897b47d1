use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hl7::FieldWarning;
use labflow_core::constants::THRESHOLDS_FILE_ENV;
use labflow_core::{
    process_message, resolve_threshold_config, CriticalAlert, EmrDocument, EmrTarget,
    ThresholdConfig,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labflow")]
#[command(about = "HL7 lab result ingestion CLI")]
struct Cli {
    /// YAML threshold file (defaults to LABFLOW_THRESHOLDS_FILE, then the clinical defaults)
    #[arg(long, global = true)]
    thresholds: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process ORU^R01 messages from a file, one message per blank-line separated block
    Process {
        /// File containing one or more messages
        file: PathBuf,
        /// Downstream document shape: epic or cerner
        #[arg(long, default_value = "epic")]
        target: EmrTarget,
    },
    /// Print the active critical threshold table as YAML
    Thresholds,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("labflow=info".parse()?)
                .add_directive("hl7=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let thresholds_path = cli
        .thresholds
        .or_else(|| std::env::var_os(THRESHOLDS_FILE_ENV).map(PathBuf::from));
    let config = resolve_threshold_config(thresholds_path)?;

    match cli.command {
        Commands::Process { file, target } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            tracing::info!("++ Processing {} for {}", file.display(), target);

            let mut out = std::io::stdout().lock();
            let stats = process_batch(&text, target, &config, &mut out)?;
            log_statistics(&file, &stats);
        }
        Commands::Thresholds => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

// ============================================================================
// Batch processing
// ============================================================================

/// Split file contents into messages on blank lines.
///
/// A line ends at `\r\n`, `\r` or `\n`, so `\r\r` separates messages in a file that uses the
/// HL7 segment terminator. Segment lines of each message are rejoined with carriage returns.
fn split_messages(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let mut messages = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.split(|c: char| c == '\r' || c == '\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                messages.push(current.join("\r"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        messages.push(current.join("\r"));
    }

    messages
}

/// One JSON line per message.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope {
    Success {
        message_id: String,
        target: EmrTarget,
        data: EmrDocument,
        has_critical: bool,
        critical_count: usize,
        warnings: Vec<FieldWarning>,
    },
    Error {
        message_id: Option<String>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        segment_index: Option<usize>,
        /// Byte offset into the message as split from the file.
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<usize>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<FieldWarning>,
    },
}

struct Outcome {
    envelope: Envelope,
    alert: Option<CriticalAlert>,
    critical_count: usize,
}

fn process_one(
    raw: &str,
    target: EmrTarget,
    config: &ThresholdConfig,
    issued_at: DateTime<Utc>,
) -> Outcome {
    let evaluated = match process_message(raw, config) {
        Ok(evaluated) => evaluated,
        Err(err) => {
            tracing::error!("{}", err);
            return Outcome {
                envelope: Envelope::Error {
                    message_id: None,
                    error: err.to_string(),
                    segment_index: err.segment_index(),
                    offset: err.offset(),
                    warnings: Vec::new(),
                },
                alert: None,
                critical_count: 0,
            };
        }
    };

    let message_id = evaluated.message().header.control_id.clone();
    let alert = evaluated.critical_alert(issued_at);
    let envelope = match evaluated.render(target) {
        Ok(data) => Envelope::Success {
            message_id,
            target,
            data,
            has_critical: evaluated.has_critical(),
            critical_count: evaluated.critical_count(),
            warnings: evaluated.warnings().to_vec(),
        },
        Err(err) => {
            tracing::error!("message {}: {}", message_id, err);
            Envelope::Error {
                message_id: Some(message_id),
                error: err.to_string(),
                segment_index: None,
                offset: None,
                warnings: evaluated.warnings().to_vec(),
            }
        }
    };

    Outcome {
        envelope,
        alert,
        critical_count: evaluated.critical_count(),
    }
}

/// Process every message in `text`, writing envelopes and alert records as JSON lines.
fn process_batch(
    text: &str,
    target: EmrTarget,
    config: &ThresholdConfig,
    out: &mut impl Write,
) -> anyhow::Result<Stats> {
    let mut stats = Stats::default();

    for raw in split_messages(text) {
        let outcome = process_one(&raw, target, config, Utc::now());
        stats.record(&outcome);

        serde_json::to_writer(&mut *out, &outcome.envelope)?;
        writeln!(out)?;

        if let Some(alert) = &outcome.alert {
            tracing::warn!(
                "critical alert for patient {}: {} value(s)",
                alert.patient_id.as_deref().unwrap_or("<unknown>"),
                alert.critical_values.len()
            );
            serde_json::to_writer(&mut *out, alert)?;
            writeln!(out)?;
        }
    }

    serde_json::to_writer(&mut *out, &serde_json::json!({ "statistics": stats.report() }))?;
    writeln!(out)?;

    Ok(stats)
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct Stats {
    processed: usize,
    errors: usize,
    critical_values: usize,
}

impl Stats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome.envelope {
            Envelope::Success { .. } => self.processed += 1,
            Envelope::Error { .. } => self.errors += 1,
        }
        self.critical_values += outcome.critical_count;
    }

    fn success_rate(&self) -> Option<f64> {
        let total = self.processed + self.errors;
        (total > 0).then(|| self.processed as f64 / total as f64 * 100.0)
    }

    fn success_rate_label(&self) -> String {
        match self.success_rate() {
            Some(rate) => format!("{rate:.1}%"),
            None => "N/A".to_string(),
        }
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "processed": self.processed,
            "errors": self.errors,
            "critical_values": self.critical_values,
            "success_rate": self.success_rate_label(),
        })
    }
}

fn log_statistics(file: &Path, stats: &Stats) {
    tracing::info!(
        "-- Finished {}: processed={}, errors={}, critical_values={}, success_rate={}",
        file.display(),
        stats.processed,
        stats.errors,
        stats.critical_values,
        stats.success_rate_label()
    );
}
