//! Shared test utilities for the chain vault crates.
//!
//! - [`mock_vault`] - A vault wired to a fresh in-process ledger
//! - [`test_vault_config`] / [`degraded_vault_config`] - Fast test configurations
//! - [`sample_post`] / [`sample_user`] - Sample records
//! - [`strategies`] - Proptest strategies for JSON records and keys

#![deny(unsafe_code)]

mod config;
pub use config::{
    TEST_ADMIN_SEED, TEST_CONTRACT_ID, degraded_vault_config, mock_vault, mock_vault_with,
    test_admin, test_poll_policy, test_retry_policy, test_vault_config,
};

mod records;
pub use records::{SampleUser, sample_post, sample_user};

pub mod strategies;
