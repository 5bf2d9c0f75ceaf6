//! Test configuration helpers.
//!
//! Centralizes the contract id, admin seed and short timings used by vault
//! tests so that polling and retry loops finish quickly.

use std::{sync::Arc, time::Duration};

use chain_vault_sdk::{
    Keypair, LedgerClient, PollPolicy, RetryPolicy, Vault, VaultConfig, mock::MockLedger,
};

/// A well-formed contract id accepted by the degraded-mode check.
pub const TEST_CONTRACT_ID: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

/// Seed of the admin keypair used by [`test_vault_config`].
pub const TEST_ADMIN_SEED: [u8; 32] = [42; 32];

/// Returns the admin keypair used by [`test_vault_config`].
#[must_use]
pub fn test_admin() -> Keypair {
    Keypair::from_seed(TEST_ADMIN_SEED)
}

/// Returns the retry policy used by [`test_vault_config`]: three attempts,
/// 20ms apart.
#[must_use]
pub fn test_retry_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, delay: Duration::from_millis(20) }
}

/// Returns the poll policy used by [`test_vault_config`]: five polls, 5ms
/// apart.
#[must_use]
pub fn test_poll_policy() -> PollPolicy {
    PollPolicy { max_polls: 5, interval: Duration::from_millis(5) }
}

/// Returns a fully configured vault configuration with fast timings.
///
/// # Panics
///
/// Panics if the builder rejects the fixed test values.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_vault_config() -> VaultConfig {
    VaultConfig::builder()
        .with_contract_id(TEST_CONTRACT_ID)
        .with_admin_secret(test_admin().secret())
        .with_retry_policy(test_retry_policy())
        .with_poll_policy(test_poll_policy())
        .with_read_concurrency(4)
        .build()
        .expect("test vault config")
}

/// Returns a configuration with no contract id, for degraded-mode tests.
///
/// # Panics
///
/// Panics if the builder rejects the fixed test values.
#[must_use]
#[allow(clippy::expect_used)]
pub fn degraded_vault_config() -> VaultConfig {
    VaultConfig::builder()
        .with_admin_secret(test_admin().secret())
        .with_retry_policy(test_retry_policy())
        .with_poll_policy(test_poll_policy())
        .build()
        .expect("degraded vault config")
}

/// Returns a vault over a fresh in-process ledger, and the ledger.
#[must_use]
pub fn mock_vault() -> (Vault, Arc<MockLedger>) {
    mock_vault_with(test_vault_config())
}

/// Returns a vault with `config` over a fresh in-process ledger.
#[must_use]
pub fn mock_vault_with(config: VaultConfig) -> (Vault, Arc<MockLedger>) {
    let ledger = Arc::new(MockLedger::new());
    let vault = Vault::new(LedgerClient::new(config, ledger.clone()));
    (vault, ledger)
}
