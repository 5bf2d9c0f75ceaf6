//! End-to-end tests for the vault SDK against a deployed contract.
//!
//! These tests submit real transactions through a JSON-RPC endpoint. They
//! read the usual configuration variables (`SOROBAN_RPC_URL`,
//! `VAULT_CONTRACT_ID`, `STACK_ADMIN_SECRET`) and only run when
//! `VAULT_E2E=1` is also set.
//!
//! Without `VAULT_E2E` all tests skip gracefully, so that
//! `cargo test --workspace` passes offline.
//!
//! ## Test Categories
//!
//! - **Write/Read Cycle**: put, overwrite and get through consensus
//! - **Listing**: collection index over several records
//! - **Secondary indexes**: lookup by field value
//! - **Contract accessors**: metadata and storage statistics

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::{SystemTime, UNIX_EPOCH};

use chain_vault_sdk::{Vault, VaultConfig};
use serde_json::json;

// ============================================================================
// Live Network Helpers
// ============================================================================

/// Builds a vault from the environment if e2e runs are enabled and the
/// contract is writable. Returns `None` otherwise.
fn require_live_vault() -> Option<Vault> {
    if std::env::var("VAULT_E2E").ok().as_deref() != Some("1") {
        return None;
    }
    let config = VaultConfig::from_env().expect("vault config from env");
    let vault = Vault::connect(config).expect("vault connect");
    vault.client().can_write().then_some(vault)
}

/// Skip macro: returns early if no live contract is available.
macro_rules! require_vault {
    () => {
        match require_live_vault() {
            Some(vault) => vault,
            None => {
                eprintln!(
                    "VAULT_E2E not set or contract not writable, skipping SDK e2e test. \
                     Set VAULT_E2E=1 with VAULT_CONTRACT_ID and STACK_ADMIN_SECRET"
                );
                return;
            },
        }
    };
}

/// A collection name unique to this run, so reruns start from an empty index.
fn run_collection(prefix: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    format!("{prefix}{nanos}")
}

// ============================================================================
// E2E Tests: Write/Read Cycle
// ============================================================================

#[tokio::test]
async fn test_put_overwrite_get() {
    let vault = require_vault!();
    let posts = run_collection("Posts");

    vault.put(&posts, "p1", &json!({ "Title": "Flood Relief", "NeedAmount": 5000 })).await.unwrap();
    vault.put(&posts, "p1", &json!({ "Title": "Flood Relief", "NeedAmount": 7000 })).await.unwrap();

    let post = vault.get(&posts, "p1").await.unwrap().expect("post stored");
    assert_eq!(post["NeedAmount"], 7000);
    assert_eq!(vault.collections().read(&posts).await.unwrap(), vec!["p1"]);
}

// ============================================================================
// E2E Tests: Listing
// ============================================================================

#[tokio::test]
async fn test_get_all_lists_every_record() {
    let vault = require_vault!();
    let tasks = run_collection("Tasks");

    for i in 0..3 {
        vault.put(&tasks, &format!("t{i}"), &json!({ "step": i })).await.unwrap();
    }
    let all = vault.get_all(&tasks).await.unwrap();
    assert_eq!(all, vec![json!({ "step": 0 }), json!({ "step": 1 }), json!({ "step": 2 })]);
}

// ============================================================================
// E2E Tests: Secondary indexes
// ============================================================================

#[tokio::test]
async fn test_lookup_by_email() {
    let vault = require_vault!();
    let users = run_collection("Users");

    let user = json!({ "Name": "Mira", "Email": "mira@example.org" });
    vault.put_with_index(&users, "u1", &user, "Email", "mira@example.org").await.unwrap();

    assert_eq!(vault.get_by_index(&users, "Email", "mira@example.org").await.unwrap(), Some(user));
    assert_eq!(vault.get_by_index(&users, "Email", "nobody@example.org").await.unwrap(), None);
}

// ============================================================================
// E2E Tests: Contract accessors
// ============================================================================

#[tokio::test]
async fn test_meta_and_stats() {
    let vault = require_vault!();
    let logs = run_collection("Logs");

    vault.put(&logs, "l1", &json!({ "event": "mission_started" })).await.unwrap();
    let meta = vault.get_meta(&logs, "l1").await.unwrap().expect("meta stored");
    assert!(meta.compressed_size > 0);
    assert!(vault.has(&logs, "l1").await.unwrap());
    assert!(vault.get_stats().await.unwrap().total_entries > 0);
}
