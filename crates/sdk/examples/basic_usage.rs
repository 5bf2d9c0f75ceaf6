//! Basic usage example demonstrating vault reads and writes.
//!
//! Run: `cargo run --example basic_usage`
//!
//! With `VAULT_CONTRACT_ID` and `STACK_ADMIN_SECRET` set, the example talks to
//! the configured network. Otherwise it runs against the in-process mock
//! ledger.
//!
//! This example shows:
//! - Client configuration from the environment
//! - Storing, overwriting and listing records
//! - Secondary index lookups
//! - Reading contract metadata and statistics

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chain_vault_sdk::{Keypair, LedgerClient, Result, Vault, VaultConfig, mock::MockLedger};
use serde_json::json;

fn mock_vault() -> Result<Vault> {
    let config = VaultConfig::builder()
        .with_contract_id("CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC")
        .with_admin_secret(Keypair::from_seed([1; 32]).secret())
        .build()?;
    Ok(Vault::new(LedgerClient::new(config, Arc::new(MockLedger::new()))))
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------------------------------------------------
    // 1. Create a vault from configuration
    // -------------------------------------------------------------------------
    let from_env = Vault::connect(VaultConfig::from_env()?)?;
    let vault = if from_env.client().can_write() {
        println!("Using contract {:?}", from_env.contract_status().contract_id());
        from_env
    } else {
        println!("No writable contract configured, using the mock ledger");
        mock_vault()?
    };

    // -------------------------------------------------------------------------
    // 2. Store a record, then overwrite it
    // -------------------------------------------------------------------------
    let outcome = vault.put("Posts", "p1", &json!({ "Title": "Flood Relief", "NeedAmount": 5000 })).await?;
    println!("Stored p1: {:?}", outcome.status);

    vault.put("Posts", "p1", &json!({ "Title": "Flood Relief", "NeedAmount": 7000 })).await?;
    let post = vault.get("Posts", "p1").await?;
    println!("p1 now reads: {post:?}");

    // -------------------------------------------------------------------------
    // 3. List a collection
    // -------------------------------------------------------------------------
    vault.put("Posts", "p2", &json!({ "Title": "School Supplies", "NeedAmount": 1200 })).await?;
    for post in vault.get_all("Posts").await? {
        println!("  {post}");
    }

    // -------------------------------------------------------------------------
    // 4. Secondary index lookup
    // -------------------------------------------------------------------------
    let user = json!({ "Name": "Mira", "Email": "mira@example.org" });
    vault.put_with_index("Users", "u1", &user, "Email", "mira@example.org").await?;
    let found = vault.get_by_index("Users", "Email", "mira@example.org").await?;
    println!("Lookup by email: {found:?}");

    // -------------------------------------------------------------------------
    // 5. Contract metadata
    // -------------------------------------------------------------------------
    if let Some(meta) = vault.get_meta("Posts", "p1").await? {
        println!("p1: {} bytes stored, version {}, zone {}", meta.compressed_size, meta.version, meta.zone);
    }
    let stats = vault.get_stats().await?;
    println!("Entries: {} ({} hot, {} cold)", stats.total_entries, stats.hot_entries, stats.cold_entries);

    vault.shutdown();
    Ok(())
}
