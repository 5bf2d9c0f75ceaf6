//! Client storage engine for a compressed, indexed key-value vault on a
//! smart-contract ledger.
//!
//! The ledger contract only offers `put(collection, id, bytes)` and
//! `get(collection, id)`. This SDK layers records, collection listing,
//! secondary indexes and reliable writes on top of it.
//!
//! # Features
//!
//! - **Compressed records**: any `Serialize` value, stored as zstd-framed JSON
//! - **Collection listing**: `get_all` over a client-maintained index entry
//! - **Secondary indexes**: `put_with_index` / `get_by_index` field lookups
//! - **Reliable writes**: fresh sequence per attempt, bounded bad-sequence
//!   retry, confirmation polling
//! - **Simulated reads**: no signing, no sequence consumption
//! - **Degraded mode**: without a contract, writes are skipped and reads are empty
//!
//! # Quick Start
//!
//! ```no_run
//! use chain_vault_sdk::{Vault, VaultConfig};
//! use serde_json::json;
//!
//! # async fn example() -> chain_vault_sdk::Result<()> {
//! let vault = Vault::connect(VaultConfig::from_env()?)?;
//!
//! vault.put("Posts", "p1", &json!({ "Title": "Flood Relief", "NeedAmount": 5000 })).await?;
//! let post = vault.get("Posts", "p1").await?;
//! let posts = vault.get_all("Posts").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Vault / Repository<T> (Public API)          │
//! │  put │ get │ get_all │ put_with_index │ stats │ delete      │
//! ├─────────────────────────────────────────────────────────────┤
//! │            CollectionIndex │ SecondaryIndex                 │
//! │   System/Index_<c> lists  │ <c>_<field>_Index lookups       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      EntryStore                             │
//! │   Validation │ Compression │ put / get contract calls       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                LedgerClient (backon, tokio-util)            │
//! │   Sequence fetch │ Sign │ Bad-sequence retry │ Polling      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   LedgerRpc transport                       │
//! │   HttpRpc (JSON-RPC over reqwest) │ MockLedger (tests)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write is signed by one admin account. Its sequence number is the
//! serialization point for all writes and the throughput ceiling of the
//! system.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod index;
mod ledger;
mod metrics;
pub mod mock;
mod repository;
mod retry;
pub mod rpc;
pub mod scval;
mod signer;
mod store;
mod vault;

// Public API exports
pub use config::{
    ContractStatus, DEFAULT_RPC_URL, ENV_ADMIN_SECRET, ENV_BASE_FEE, ENV_CONTRACT_ID,
    ENV_NETWORK_PASSPHRASE, ENV_RPC_URL, PLACEHOLDER_CONTRACT_ID, PollPolicy, RetryPolicy,
    RetryPolicyBuilder, TESTNET_PASSPHRASE, UnconfiguredReason, VaultConfig, VaultConfigBuilder,
};
pub use error::{BAD_SEQUENCE_MARKER, Result, VaultError, is_bad_sequence};
pub use http::HttpRpc;
pub use index::{CollectionIndex, SecondaryIndex};
pub use ledger::{LedgerClient, SubmitOutcome, SubmitStatus};
pub use metrics::{ConfirmationOutcome, MetricsVaultMetrics, NoopVaultMetrics, VaultMetrics};
pub use repository::Repository;
pub use retry::{PollOutcome, poll_confirmation, with_retry, with_retry_cancellable};
pub use signer::{Keypair, verify_transaction};
pub use store::EntryStore;
pub use vault::Vault;

// Re-export the record types and codec
pub use chain_vault_types::{
    ChunkMeta, CodecError, CompressionAlgo, IndexEntry, StorageStats, StorageZone,
    ValidationConfig, ValidationError,
};
