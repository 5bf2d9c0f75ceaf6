//! The ledger RPC seam.
//!
//! [`LedgerRpc`] is the only way the client reaches the network. The HTTP
//! implementation lives in [`crate::http`]; tests use [`crate::mock`].
//!
//! Transactions carry a single contract-call operation. Their signature base
//! is `sha256(sha256(network_passphrase) || json(transaction))`, and the hex
//! form of that digest is the transaction hash used for status lookups.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{Result, VaultError},
    scval::ScVal,
};

/// A contract method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Target contract strkey.
    pub contract_id: String,
    /// Contract method name.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<ScVal>,
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Source account (`G…` strkey).
    pub source: String,
    /// Sequence number consumed by this transaction.
    pub sequence: u64,
    /// Inclusion fee in stroops.
    pub fee: u32,
    /// Expiration window in seconds.
    pub timeout_secs: u64,
    /// The single operation.
    pub operation: ContractCall,
    /// Resource fee filled in by `prepare_transaction`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_fee: Option<u64>,
}

impl Transaction {
    /// Returns the digest that must be signed.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Signer` if the transaction cannot be encoded.
    pub fn signing_payload(&self, network_passphrase: &str) -> Result<[u8; 32]> {
        let body = serde_json::to_vec(self)
            .map_err(|e| VaultError::Signer { message: format!("encode transaction: {e}") })?;
        let network_id = Sha256::digest(network_passphrase.as_bytes());
        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(&body);
        Ok(hasher.finalize().into())
    }

    /// Returns the hex transaction hash.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::signing_payload`].
    pub fn hash(&self, network_passphrase: &str) -> Result<String> {
        self.signing_payload(network_passphrase).map(hex::encode)
    }
}

/// A transaction with its ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The signed transaction.
    pub transaction: Transaction,
    /// Public key of the signer (`G…` strkey).
    pub signer: String,
    /// Hex signature over the signing payload.
    pub signature: String,
}

/// Ledger view of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Last consumed sequence number.
    pub sequence: u64,
}

/// Immediate classification of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    /// Accepted into the queue; poll for the outcome.
    Pending,
    /// Already submitted.
    Duplicate,
    /// The node is overloaded.
    TryAgainLater,
    /// Rejected; see `error_result`.
    Error,
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Duplicate => "DUPLICATE",
            Self::TryAgainLater => "TRY_AGAIN_LATER",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Response to `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    /// Immediate status.
    pub status: SendStatus,
    /// Transaction hash.
    pub hash: String,
    /// Raw rejection payload when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_result: Option<serde_json::Value>,
}

impl SendResponse {
    /// Returns the rejection payload as text for diagnostics.
    #[must_use]
    pub fn error_text(&self) -> String {
        match &self.error_result {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// Status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Applied successfully.
    Success,
    /// Not yet seen by the node.
    NotFound,
    /// Applied and failed.
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::NotFound => "NOT_FOUND",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Result of a read-only simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResponse {
    /// Return value; `None` when the call produced nothing.
    #[serde(default)]
    pub result: Option<ScVal>,
    /// Error reported by the simulation.
    #[serde(default)]
    pub error: Option<String>,
}

/// Network operations the vault client depends on.
#[async_trait]
pub trait LedgerRpc: Send + Sync + fmt::Debug {
    /// Reads an account's current sequence number.
    async fn get_account(&self, address: &str) -> Result<AccountState>;

    /// Fills in resource fees and footprint for a transaction.
    async fn prepare_transaction(&self, tx: Transaction) -> Result<Transaction>;

    /// Submits a signed transaction.
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<SendResponse>;

    /// Looks up the status of a submitted transaction.
    async fn get_transaction(&self, hash: &str) -> Result<TransactionStatus>;

    /// Dry-runs a transaction without consuming a sequence number.
    async fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulationResponse>;
}
