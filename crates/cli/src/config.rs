//! Command-line arguments.
//!
//! Connection settings come from flags or the same environment variables the
//! SDK reads, with flags taking precedence.

use clap::{Args, Parser, Subcommand, ValueEnum};

use chain_vault_sdk::{
    DEFAULT_RPC_URL, ENV_ADMIN_SECRET, ENV_BASE_FEE, ENV_CONTRACT_ID, ENV_NETWORK_PASSPHRASE,
    ENV_RPC_URL, Result, StorageZone, TESTNET_PASSPHRASE, VaultConfig,
};

/// Operator command line for the chain vault.
#[derive(Debug, Parser)]
#[command(name = "chain-vault")]
#[command(version)]
#[command(about = "Read and write records in an on-chain vault contract")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionOptions,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Auto, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// How the contract and signer are reached.
#[derive(Debug, Clone, Args)]
pub struct ConnectionOptions {
    /// JSON-RPC endpoint of the network.
    #[arg(long, env = ENV_RPC_URL, default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: String,

    /// Network passphrase signed into every transaction.
    #[arg(long, env = ENV_NETWORK_PASSPHRASE, default_value = TESTNET_PASSPHRASE, global = true)]
    pub network_passphrase: String,

    /// Vault contract id (`C…`). Without it every command runs degraded.
    #[arg(long, env = ENV_CONTRACT_ID, global = true)]
    pub contract_id: Option<String>,

    /// Admin secret seed (`S…`) used to sign writes.
    #[arg(long, env = ENV_ADMIN_SECRET, hide_env_values = true, global = true)]
    pub admin_secret: Option<String>,

    /// Base fee per transaction, in stroops.
    #[arg(long, env = ENV_BASE_FEE, global = true)]
    pub base_fee: Option<u32>,

    /// Maximum parallel reads for `get-all`.
    #[arg(long, global = true)]
    pub read_concurrency: Option<usize>,
}

impl ConnectionOptions {
    /// Builds the vault configuration.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` if a value is rejected by the builder.
    pub fn to_vault_config(&self) -> Result<VaultConfig> {
        let mut builder = VaultConfig::builder()
            .with_rpc_url(self.rpc_url.clone())
            .with_network_passphrase(self.network_passphrase.clone());
        if let Some(contract_id) = &self.contract_id {
            builder = builder.with_contract_id(contract_id.clone());
        }
        if let Some(secret) = &self.admin_secret {
            builder = builder.with_admin_secret(secret.clone());
        }
        if let Some(fee) = self.base_fee {
            builder = builder.with_base_fee(fee);
        }
        if let Some(concurrency) = self.read_concurrency {
            builder = builder.with_read_concurrency(concurrency);
        }
        builder.build()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per event.
    Json,
    /// JSON when stdout is not a terminal, text otherwise.
    Auto,
}

/// Storage tier for `put --zone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ZoneArg {
    Hot,
    Cold,
}

impl From<ZoneArg> for StorageZone {
    fn from(zone: ZoneArg) -> Self {
        match zone {
            ZoneArg::Hot => Self::Hot,
            ZoneArg::Cold => Self::Cold,
        }
    }
}

/// Vault operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a JSON record and list it in its collection.
    Put {
        collection: String,
        id: String,
        /// Record as a JSON document.
        json: String,
        /// Place the entry in a specific storage tier.
        #[arg(long, value_enum)]
        zone: Option<ZoneArg>,
    },

    /// Store a JSON record with a secondary index on `field = value`.
    PutIndexed {
        collection: String,
        id: String,
        json: String,
        field: String,
        value: String,
    },

    /// Append a JSON patch to an entry's delta log.
    Delta {
        collection: String,
        id: String,
        json: String,
    },

    /// Print one record.
    Get { collection: String, id: String },

    /// Print every listed record of a collection.
    GetAll { collection: String },

    /// Print the record a secondary index points at.
    GetByIndex {
        collection: String,
        field: String,
        value: String,
    },

    /// Print on-chain metadata of an entry.
    Meta { collection: String, id: String },

    /// Print the decoded delta log of an entry.
    Deltas { collection: String, id: String },

    /// Check whether an entry exists.
    Has { collection: String, id: String },

    /// Check the bloom filter for a key. `false` is definitive.
    Bloom { collection: String, id: String },

    /// Print the contract-side index of a collection.
    Index { collection: String },

    /// Print contract-wide storage statistics.
    Stats,

    /// Move an entry to cold storage.
    Migrate { collection: String, id: String },

    /// Delete an entry and unlist it.
    Delete { collection: String, id: String },

    /// Run the recruitment, mission, proof and verification journey against
    /// the configured contract.
    Simulate,
}
