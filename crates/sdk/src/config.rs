//! Vault client configuration with builder pattern.
//!
//! Provides type-safe configuration for the vault client including:
//! - RPC endpoint and network passphrase
//! - Contract identifier and admin secret (both optional: their absence puts
//!   the client in degraded mode rather than failing construction)
//! - Transaction fee and expiration window
//! - Sequence-conflict retry policy and confirmation poll policy

use std::{sync::Arc, time::Duration};

use chain_vault_types::ValidationConfig;
use snafu::ensure;

use crate::{
    error::{ConfigSnafu, Result},
    metrics::{VaultMetrics, default_metrics},
};

/// Default Soroban RPC endpoint (testnet).
pub const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";

/// Default network passphrase (testnet).
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Known placeholder contract id that must never be called.
pub const PLACEHOLDER_CONTRACT_ID: &str = "CC76VNFKSTN5KOR7LHTCDI4QW44V5F5B5N5E5P5S5W5S5X5C5H5U5P5U";

/// Length of a contract strkey.
const CONTRACT_ID_LEN: usize = 56;

/// Default base fee in stroops.
const DEFAULT_BASE_FEE: u32 = 100;

/// Default transaction expiration window (30 seconds).
const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP request timeout (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on parallel reads issued by `get_all`.
const DEFAULT_READ_CONCURRENCY: usize = 16;

/// Environment variable holding the RPC endpoint.
pub const ENV_RPC_URL: &str = "SOROBAN_RPC_URL";
/// Environment variable holding the vault contract id.
pub const ENV_CONTRACT_ID: &str = "VAULT_CONTRACT_ID";
/// Environment variable holding the admin secret seed.
pub const ENV_ADMIN_SECRET: &str = "STACK_ADMIN_SECRET";
/// Environment variable overriding the network passphrase.
pub const ENV_NETWORK_PASSPHRASE: &str = "VAULT_NETWORK_PASSPHRASE";
/// Environment variable overriding the base fee.
pub const ENV_BASE_FEE: &str = "VAULT_BASE_FEE";

// =============================================================================
// Contract status
// =============================================================================

/// Why the client is running without a usable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnconfiguredReason {
    /// No contract id was supplied.
    Missing,
    /// The supplied id is the known placeholder.
    Placeholder,
    /// The supplied id is not a 56-character `C…` strkey.
    Malformed,
}

impl UnconfiguredReason {
    /// Returns a short description for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Placeholder => "placeholder",
            Self::Malformed => "malformed",
        }
    }
}

/// Whether the client can talk to a deployed contract.
///
/// `Unconfigured` is an operating mode, not an error: writes become logged
/// no-ops and reads return empty results without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractStatus {
    /// A plausible contract id is configured.
    Configured(String),
    /// Degraded mode.
    Unconfigured(UnconfiguredReason),
}

impl ContractStatus {
    /// Classifies an optional contract id.
    #[must_use]
    pub fn classify(contract_id: Option<&str>) -> Self {
        let Some(id) = contract_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Self::Unconfigured(UnconfiguredReason::Missing);
        };
        if id == PLACEHOLDER_CONTRACT_ID {
            return Self::Unconfigured(UnconfiguredReason::Placeholder);
        }
        if id.len() != CONTRACT_ID_LEN || !id.starts_with('C') {
            return Self::Unconfigured(UnconfiguredReason::Malformed);
        }
        Self::Configured(id.to_owned())
    }

    /// Returns the contract id when configured.
    #[must_use]
    pub fn contract_id(&self) -> Option<&str> {
        match self {
            Self::Configured(id) => Some(id),
            Self::Unconfigured(_) => None,
        }
    }

    /// Returns true when a contract id is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Retry policy for sequence conflicts.
///
/// The delay is fixed: every retry waits `delay`, re-reads the account
/// sequence and rebuilds the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,

    /// Delay before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(2) }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy builder.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    delay: Option<Duration>,
}

impl RetryPolicyBuilder {
    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the delay before each retry.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Builds the retry policy.
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            delay: self.delay.unwrap_or(defaults.delay),
        }
    }
}

/// Confirmation polling policy for transactions accepted as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of status polls after the initial lookup.
    pub max_polls: u32,

    /// Interval between polls.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_polls: 15, interval: Duration::from_secs(1) }
    }
}

// =============================================================================
// Client configuration
// =============================================================================

/// Configuration for the vault client.
#[derive(Clone)]
pub struct VaultConfig {
    pub(crate) rpc_url: String,
    pub(crate) network_passphrase: String,
    pub(crate) contract_id: Option<String>,
    pub(crate) admin_secret: Option<String>,
    pub(crate) reader_address: Option<String>,
    pub(crate) base_fee: u32,
    pub(crate) tx_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) poll_policy: PollPolicy,
    pub(crate) read_concurrency: usize,
    pub(crate) validation: ValidationConfig,
    pub(crate) metrics: Arc<dyn VaultMetrics>,
}

impl VaultConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> VaultConfigBuilder {
        VaultConfigBuilder::default()
    }

    /// Builds a configuration from the process environment.
    ///
    /// Reads `SOROBAN_RPC_URL`, `VAULT_CONTRACT_ID`, `STACK_ADMIN_SECRET`,
    /// `VAULT_NETWORK_PASSPHRASE` and `VAULT_BASE_FEE`. Missing contract or
    /// secret variables are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if `VAULT_BASE_FEE` is not a number or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`VaultConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup(ENV_RPC_URL) {
            builder = builder.with_rpc_url(url);
        }
        if let Some(passphrase) = lookup(ENV_NETWORK_PASSPHRASE) {
            builder = builder.with_network_passphrase(passphrase);
        }
        if let Some(contract_id) = lookup(ENV_CONTRACT_ID) {
            builder = builder.with_contract_id(contract_id);
        }
        if let Some(secret) = lookup(ENV_ADMIN_SECRET) {
            builder = builder.with_admin_secret(secret);
        }
        if let Some(fee) = lookup(ENV_BASE_FEE) {
            let fee = fee.trim().parse::<u32>().map_err(|e| {
                ConfigSnafu { message: format!("{ENV_BASE_FEE} is not a valid fee: {e}") }.build()
            })?;
            builder = builder.with_base_fee(fee);
        }
        builder.build()
    }

    /// Returns the RPC endpoint URL.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Returns the network passphrase.
    #[must_use]
    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    /// Returns the raw contract id, if any.
    #[must_use]
    pub fn contract_id(&self) -> Option<&str> {
        self.contract_id.as_deref()
    }

    /// Classifies the configured contract id.
    #[must_use]
    pub fn contract_status(&self) -> ContractStatus {
        ContractStatus::classify(self.contract_id.as_deref())
    }

    /// Returns the address used as the source of read simulations, if set.
    #[must_use]
    pub fn reader_address(&self) -> Option<&str> {
        self.reader_address.as_deref()
    }

    /// Returns the base fee in stroops.
    #[must_use]
    pub fn base_fee(&self) -> u32 {
        self.base_fee
    }

    /// Returns the transaction expiration window.
    #[must_use]
    pub fn tx_timeout(&self) -> Duration {
        self.tx_timeout
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the sequence-conflict retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the confirmation poll policy.
    #[must_use]
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Returns the bound on parallel reads issued by `get_all`.
    #[must_use]
    pub fn read_concurrency(&self) -> usize {
        self.read_concurrency
    }

    /// Returns the write-path validation limits.
    #[must_use]
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Returns the metrics sink.
    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn VaultMetrics> {
        &self.metrics
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("rpc_url", &self.rpc_url)
            .field("network_passphrase", &self.network_passphrase)
            .field("contract_id", &self.contract_id)
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .field("reader_address", &self.reader_address)
            .field("base_fee", &self.base_fee)
            .field("tx_timeout", &self.tx_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("poll_policy", &self.poll_policy)
            .field("read_concurrency", &self.read_concurrency)
            .finish_non_exhaustive()
    }
}

/// Builder for [`VaultConfig`].
#[derive(Debug, Default)]
pub struct VaultConfigBuilder {
    rpc_url: Option<String>,
    network_passphrase: Option<String>,
    contract_id: Option<String>,
    admin_secret: Option<String>,
    reader_address: Option<String>,
    base_fee: Option<u32>,
    tx_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    poll_policy: Option<PollPolicy>,
    read_concurrency: Option<usize>,
    validation: Option<ValidationConfig>,
    metrics: Option<Arc<dyn VaultMetrics>>,
}

impl VaultConfigBuilder {
    /// Sets the RPC endpoint URL.
    ///
    /// Default: the public Soroban testnet endpoint.
    #[must_use]
    pub fn with_rpc_url<S: Into<String>>(mut self, url: S) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Sets the network passphrase signed into every transaction.
    #[must_use]
    pub fn with_network_passphrase<S: Into<String>>(mut self, passphrase: S) -> Self {
        self.network_passphrase = Some(passphrase.into());
        self
    }

    /// Sets the vault contract id.
    #[must_use]
    pub fn with_contract_id<S: Into<String>>(mut self, contract_id: S) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    /// Sets the admin secret seed (`S…` strkey) used to sign writes.
    #[must_use]
    pub fn with_admin_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.admin_secret = Some(secret.into());
        self
    }

    /// Sets the account used as the source of read simulations.
    ///
    /// Default: the admin public key.
    #[must_use]
    pub fn with_reader_address<S: Into<String>>(mut self, address: S) -> Self {
        self.reader_address = Some(address.into());
        self
    }

    /// Sets the base fee in stroops.
    ///
    /// Default: 100.
    #[must_use]
    pub fn with_base_fee(mut self, fee: u32) -> Self {
        self.base_fee = Some(fee);
        self
    }

    /// Sets the transaction expiration window.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP request timeout.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the sequence-conflict retry policy.
    ///
    /// Default: [`RetryPolicy::default()`].
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the confirmation poll policy.
    ///
    /// Default: [`PollPolicy::default()`].
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = Some(policy);
        self
    }

    /// Sets the bound on parallel reads issued by `get_all`.
    ///
    /// Default: 16.
    #[must_use]
    pub fn with_read_concurrency(mut self, concurrency: usize) -> Self {
        self.read_concurrency = Some(concurrency);
        self
    }

    /// Sets the write-path validation limits.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Sets the metrics sink.
    ///
    /// Default: [`NoopVaultMetrics`](crate::metrics::NoopVaultMetrics).
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn VaultMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The RPC URL is not HTTP(S)
    /// - The network passphrase is empty
    /// - The transaction timeout is zero
    /// - The retry policy allows zero attempts
    /// - The poll interval is zero
    /// - The read concurrency is zero
    pub fn build(self) -> Result<VaultConfig> {
        let rpc_url = self.rpc_url.unwrap_or_else(|| DEFAULT_RPC_URL.to_owned());
        ensure!(
            rpc_url.starts_with("http://") || rpc_url.starts_with("https://"),
            ConfigSnafu { message: format!("rpc_url must be http(s): {rpc_url}") }
        );

        let network_passphrase =
            self.network_passphrase.unwrap_or_else(|| TESTNET_PASSPHRASE.to_owned());
        ensure!(
            !network_passphrase.is_empty(),
            ConfigSnafu { message: "network_passphrase cannot be empty" }
        );

        let tx_timeout = self.tx_timeout.unwrap_or(DEFAULT_TX_TIMEOUT);
        ensure!(!tx_timeout.is_zero(), ConfigSnafu { message: "tx_timeout cannot be zero" });

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        ensure!(
            !request_timeout.is_zero(),
            ConfigSnafu { message: "request_timeout cannot be zero" }
        );

        let retry_policy = self.retry_policy.unwrap_or_default();
        ensure!(
            retry_policy.max_attempts > 0,
            ConfigSnafu { message: "retry_policy.max_attempts must be at least 1" }
        );

        let poll_policy = self.poll_policy.unwrap_or_default();
        ensure!(
            !poll_policy.interval.is_zero(),
            ConfigSnafu { message: "poll_policy.interval cannot be zero" }
        );

        let read_concurrency = self.read_concurrency.unwrap_or(DEFAULT_READ_CONCURRENCY);
        ensure!(read_concurrency > 0, ConfigSnafu { message: "read_concurrency cannot be zero" });

        Ok(VaultConfig {
            rpc_url,
            network_passphrase,
            contract_id: self.contract_id.filter(|id| !id.trim().is_empty()),
            admin_secret: self.admin_secret.filter(|secret| !secret.trim().is_empty()),
            reader_address: self.reader_address,
            base_fee: self.base_fee.unwrap_or(DEFAULT_BASE_FEE),
            tx_timeout,
            request_timeout,
            retry_policy,
            poll_policy,
            read_concurrency,
            validation: self.validation.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_else(default_metrics),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const VALID_ID: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    #[test]
    fn test_defaults() {
        let config = VaultConfig::builder().build().unwrap();
        assert_eq!(config.rpc_url(), DEFAULT_RPC_URL);
        assert_eq!(config.network_passphrase(), TESTNET_PASSPHRASE);
        assert_eq!(config.base_fee(), 100);
        assert_eq!(config.tx_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
        assert_eq!(config.poll_policy().max_polls, 15);
        assert_eq!(config.read_concurrency(), 16);
        assert!(config.contract_id().is_none());
    }

    #[test]
    fn test_classify_missing_and_empty() {
        assert_eq!(
            ContractStatus::classify(None),
            ContractStatus::Unconfigured(UnconfiguredReason::Missing)
        );
        assert_eq!(
            ContractStatus::classify(Some("   ")),
            ContractStatus::Unconfigured(UnconfiguredReason::Missing)
        );
    }

    #[test]
    fn test_classify_placeholder() {
        assert_eq!(
            ContractStatus::classify(Some(PLACEHOLDER_CONTRACT_ID)),
            ContractStatus::Unconfigured(UnconfiguredReason::Placeholder)
        );
    }

    #[test]
    fn test_classify_malformed() {
        let wrong_prefix = format!("G{}", &VALID_ID[1..]);
        for id in ["C123", wrong_prefix.as_str()] {
            assert_eq!(
                ContractStatus::classify(Some(id)),
                ContractStatus::Unconfigured(UnconfiguredReason::Malformed)
            );
        }
    }

    #[test]
    fn test_classify_configured() {
        let status = ContractStatus::classify(Some(VALID_ID));
        assert!(status.is_configured());
        assert_eq!(status.contract_id(), Some(VALID_ID));
    }

    #[test]
    fn test_empty_strings_treated_as_absent() {
        let config =
            VaultConfig::builder().with_contract_id("").with_admin_secret(" ").build().unwrap();
        assert!(config.contract_id().is_none());
        assert!(config.admin_secret.is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = VaultConfig::builder().with_admin_secret("SSECRETSEED").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("SSECRETSEED"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = VaultConfig::builder().with_rpc_url("ftp://ledger").build().unwrap_err();
        assert!(err.to_string().contains("rpc_url must be http(s)"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let policy = RetryPolicy::builder().with_max_attempts(0).build();
        let err = VaultConfig::builder().with_retry_policy(policy).build().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_rejects_zero_durations() {
        assert!(VaultConfig::builder().with_tx_timeout(Duration::ZERO).build().is_err());
        let poll = PollPolicy { max_polls: 3, interval: Duration::ZERO };
        assert!(VaultConfig::builder().with_poll_policy(poll).build().is_err());
        assert!(VaultConfig::builder().with_read_concurrency(0).build().is_err());
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::builder()
            .with_max_attempts(5)
            .with_delay(Duration::from_millis(250))
            .build();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RPC_URL, "http://localhost:8000/rpc"),
            (ENV_CONTRACT_ID, VALID_ID),
            (ENV_BASE_FEE, "250"),
        ]);
        let config =
            VaultConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(config.rpc_url(), "http://localhost:8000/rpc");
        assert!(config.contract_status().is_configured());
        assert_eq!(config.base_fee(), 250);
    }

    #[test]
    fn test_from_lookup_rejects_bad_fee() {
        let err = VaultConfig::from_lookup(|key| {
            (key == ENV_BASE_FEE).then(|| "one hundred".to_owned())
        })
        .unwrap_err();
        assert!(err.to_string().contains(ENV_BASE_FEE));
    }
}
