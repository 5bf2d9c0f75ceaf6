//! Client-side metrics for the vault storage engine.
//!
//! [`VaultMetrics`] is a pluggable trait with no-op default methods. Two
//! implementations are included:
//!
//! - [`NoopVaultMetrics`]: default, discards everything.
//! - [`MetricsVaultMetrics`]: forwards to the [`metrics`](https://docs.rs/metrics) crate facade.
//!
//! # Metric Names
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `chain_vault_requests_total` | Counter | `method`, `status` | Contract calls by outcome |
//! | `chain_vault_request_duration_seconds` | Histogram | `method` | Contract call latency |
//! | `chain_vault_retries_total` | Counter | `method`, `attempt`, `error_type` | Sequence-conflict retries |
//! | `chain_vault_compressed_bytes` | Histogram | `collection` | Compressed payload sizes on put |
//! | `chain_vault_original_bytes` | Histogram | `collection` | Serialized payload sizes on put |
//! | `chain_vault_decompressions_total` | Counter | `collection`, `status` | Payload decodes on get |
//! | `chain_vault_confirmations_total` | Counter | `method`, `outcome` | Transaction confirmation outcomes |

use std::{fmt, sync::Arc, time::Duration};

/// How a submitted transaction ended from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Polling observed success.
    Confirmed,
    /// Polling observed failure.
    Failed,
    /// Polls ran out while the transaction was still unknown.
    Unconfirmed,
    /// The send response was final (no polling needed).
    Immediate,
}

impl fmt::Display for ConfirmationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
            Self::Unconfirmed => write!(f, "unconfirmed"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}

/// Trait for vault metrics collection.
///
/// Implementations must be `Send + Sync`: a single instance is shared by
/// every clone of the client.
pub trait VaultMetrics: Send + Sync + fmt::Debug {
    /// Records a completed contract call (after retries resolve).
    fn record_request(&self, method: &str, duration: Duration, success: bool) {
        let _ = (method, duration, success);
    }

    /// Records a retry. `attempt` is the number of the attempt about to run.
    fn record_retry(&self, method: &str, attempt: u32, error_type: &str) {
        let _ = (method, attempt, error_type);
    }

    /// Records payload sizes for a put.
    fn record_compression(&self, collection: &str, original: usize, compressed: usize) {
        let _ = (collection, original, compressed);
    }

    /// Records the outcome of decoding a stored payload.
    fn record_decompression(&self, collection: &str, success: bool) {
        let _ = (collection, success);
    }

    /// Records how a submitted transaction ended.
    fn record_confirmation(&self, method: &str, outcome: ConfirmationOutcome) {
        let _ = (method, outcome);
    }
}

/// No-op metrics implementation.
#[derive(Debug, Clone, Copy)]
pub struct NoopVaultMetrics;

impl VaultMetrics for NoopVaultMetrics {}

/// Metrics implementation using the `metrics` crate facade.
#[derive(Debug, Clone, Copy)]
pub struct MetricsVaultMetrics;

mod metric_names {
    pub const REQUESTS_TOTAL: &str = "chain_vault_requests_total";
    pub const REQUEST_DURATION: &str = "chain_vault_request_duration_seconds";
    pub const RETRIES_TOTAL: &str = "chain_vault_retries_total";
    pub const COMPRESSED_BYTES: &str = "chain_vault_compressed_bytes";
    pub const ORIGINAL_BYTES: &str = "chain_vault_original_bytes";
    pub const DECOMPRESSIONS_TOTAL: &str = "chain_vault_decompressions_total";
    pub const CONFIRMATIONS_TOTAL: &str = "chain_vault_confirmations_total";
}

impl VaultMetrics for MetricsVaultMetrics {
    fn record_request(&self, method: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        metrics::counter!(metric_names::REQUESTS_TOTAL, "method" => method.to_owned(), "status" => status).increment(1);
        metrics::histogram!(metric_names::REQUEST_DURATION, "method" => method.to_owned())
            .record(duration.as_secs_f64());
    }

    fn record_retry(&self, method: &str, attempt: u32, error_type: &str) {
        metrics::counter!(
            metric_names::RETRIES_TOTAL,
            "method" => method.to_owned(),
            "attempt" => attempt.to_string(),
            "error_type" => error_type.to_owned(),
        )
        .increment(1);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_compression(&self, collection: &str, original: usize, compressed: usize) {
        metrics::histogram!(metric_names::ORIGINAL_BYTES, "collection" => collection.to_owned())
            .record(original as f64);
        metrics::histogram!(metric_names::COMPRESSED_BYTES, "collection" => collection.to_owned())
            .record(compressed as f64);
    }

    fn record_decompression(&self, collection: &str, success: bool) {
        let status = if success { "success" } else { "corrupt" };
        metrics::counter!(
            metric_names::DECOMPRESSIONS_TOTAL,
            "collection" => collection.to_owned(),
            "status" => status,
        )
        .increment(1);
    }

    fn record_confirmation(&self, method: &str, outcome: ConfirmationOutcome) {
        metrics::counter!(
            metric_names::CONFIRMATIONS_TOTAL,
            "method" => method.to_owned(),
            "outcome" => outcome.to_string(),
        )
        .increment(1);
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn VaultMetrics> {
    Arc::new(NoopVaultMetrics)
}
