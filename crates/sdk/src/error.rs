//! SDK error types with retry classification.
//!
//! Provides a two-tier error model:
//! - **Infrastructure errors**: transport failures, JSON-RPC errors, failed
//!   simulations, rejected transactions
//! - **Data errors**: corrupt payloads, records of the wrong shape, ScVal
//!   results that do not decode to the expected type
//!
//! Only a ledger sequence conflict is retryable. Every other submission
//! failure is surfaced immediately with the raw payload attached.

use chain_vault_types::{CodecError, ValidationError};
use snafu::{Location, Snafu};

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Marker the ledger puts in results rejected for a stale sequence number.
pub const BAD_SEQUENCE_MARKER: &str = "txBadSeq";

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VaultError {
    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// A write was rejected before submission.
    #[snafu(display("Invalid input: {source}"))]
    InvalidInput {
        /// The violated constraint.
        source: ValidationError,
    },

    /// The admin secret could not be turned into a keypair.
    #[snafu(display("Signer error: {message}"))]
    Signer {
        /// Error description.
        message: String,
    },

    /// HTTP-level failure talking to the RPC endpoint.
    #[snafu(display("Transport error at {location}: {source}"))]
    Transport {
        /// Underlying HTTP error.
        source: reqwest::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The RPC endpoint answered with an error object or an unusable body.
    #[snafu(display("RPC error in {method}: {message}"))]
    Rpc {
        /// JSON-RPC method name.
        method: String,
        /// Error message from the endpoint.
        message: String,
    },

    /// A read-only simulation reported an error.
    #[snafu(display("Simulation of {method} failed: {message}"))]
    Simulation {
        /// Contract method that was simulated.
        method: String,
        /// Error reported by the simulation.
        message: String,
    },

    /// The ledger rejected the transaction for a stale sequence number.
    #[snafu(display("Bad sequence submitting {method}: {payload}"))]
    BadSequence {
        /// Contract method being submitted.
        method: String,
        /// Raw error payload.
        payload: String,
    },

    /// The ledger rejected the transaction for any other reason.
    #[snafu(display("Transaction {method} failed: {payload}"))]
    TransactionFailed {
        /// Contract method being submitted.
        method: String,
        /// Raw error payload for diagnostics.
        payload: String,
    },

    /// Retry attempts exhausted.
    #[snafu(display("Retry exhausted after {attempts} attempts: {last_error}"))]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message before giving up.
        last_error: String,
    },

    /// A stored payload exists but could not be decoded.
    #[snafu(display("Decompression failed for {collection}:{id}: {source}"))]
    Decompression {
        /// Collection of the corrupt entry.
        collection: String,
        /// Id of the corrupt entry.
        id: String,
        /// Underlying codec error.
        source: CodecError,
    },

    /// A record could not be encoded for storage.
    #[snafu(display("Codec error: {source}"))]
    Codec {
        /// Underlying codec error.
        source: CodecError,
    },

    /// A decoded record does not match the requested type.
    #[snafu(display("Record {collection}:{id} has an unexpected shape: {source}"))]
    RecordShape {
        /// Collection of the record.
        collection: String,
        /// Id of the record.
        id: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A contract result did not have the expected ScVal type.
    #[snafu(display("Expected {expected}, found {found}"))]
    ScValDecode {
        /// Expected type description.
        expected: String,
        /// Actual ScVal kind.
        found: String,
    },

    /// The operation was cancelled.
    #[snafu(display("Operation cancelled"))]
    Cancelled,

    /// Client is shutting down.
    #[snafu(display("Client shutting down"))]
    Shutdown,
}

impl VaultError {
    /// Returns true if the operation should be retried.
    ///
    /// Only sequence conflicts qualify: the transaction is rebuilt against a
    /// freshly read sequence number and resubmitted. Any other submission
    /// failure is fatal for the call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BadSequence { .. })
    }

    /// Returns true if a stored payload was found but is unreadable.
    #[must_use]
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, Self::Decompression { .. })
    }

    /// Returns a short label for metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Signer { .. } => "signer",
            Self::Transport { .. } => "transport",
            Self::Rpc { .. } => "rpc",
            Self::Simulation { .. } => "simulation",
            Self::BadSequence { .. } => "bad_sequence",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::Decompression { .. } => "decompression",
            Self::Codec { .. } => "codec",
            Self::RecordShape { .. } => "record_shape",
            Self::ScValDecode { .. } => "scval_decode",
            Self::Cancelled => "cancelled",
            Self::Shutdown => "shutdown",
        }
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(source: reqwest::Error) -> Self {
        Self::Transport { source, location: Location::default() }
    }
}

impl From<ValidationError> for VaultError {
    fn from(source: ValidationError) -> Self {
        Self::InvalidInput { source }
    }
}

/// Returns true if a raw ledger error payload reports a sequence conflict.
#[must_use]
pub fn is_bad_sequence(payload: &str) -> bool {
    payload.contains(BAD_SEQUENCE_MARKER)
}
