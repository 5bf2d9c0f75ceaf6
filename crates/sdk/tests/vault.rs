//! Vault facade tests against the in-process mock ledger.
//!
//! ## Test Categories
//!
//! - **Records**: put/get round trips and overwrite semantics
//! - **Listing**: collection index idempotency and `get_all` consistency
//! - **Secondary indexes**: field lookups, misses, last writer wins
//! - **Corruption**: corrupt payloads surface as decompression errors
//! - **Degraded mode**: no contract means no errors and no network calls

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chain_vault_sdk::{Repository, StorageStats, StorageZone, Vault, VaultError};
use chain_vault_test_utils::{
    SampleUser, degraded_vault_config, mock_vault, mock_vault_with, sample_post, sample_user,
    strategies,
};
use proptest::prelude::*;
use serde_json::{Value, json};

// ============================================================================
// Records
// ============================================================================

#[tokio::test]
async fn test_flood_relief_post_lifecycle() {
    let (vault, _ledger) = mock_vault();

    vault.put("Posts", "p1", &sample_post(5000)).await.unwrap();
    assert_eq!(vault.get("Posts", "p1").await.unwrap(), Some(sample_post(5000)));
    assert!(vault.get_all("Posts").await.unwrap().contains(&sample_post(5000)));

    vault.put("Posts", "p1", &sample_post(7000)).await.unwrap();
    let post = vault.get("Posts", "p1").await.unwrap().unwrap();
    assert_eq!(post["NeedAmount"], 7000);
    assert_eq!(post["Title"], "Flood Relief");

    assert_eq!(vault.collections().read("Posts").await.unwrap(), vec!["p1"]);
    assert_eq!(vault.get_all("Posts").await.unwrap(), vec![sample_post(7000)]);
}

#[tokio::test]
async fn test_typed_round_trip() {
    let (vault, _ledger) = mock_vault();
    vault.put("Users", "u1", &sample_user(1)).await.unwrap();
    let user: SampleUser = vault.get_as("Users", "u1").await.unwrap().unwrap();
    assert_eq!(user, sample_user(1));
}

#[tokio::test]
async fn test_missing_record_is_none() {
    let (vault, _ledger) = mock_vault();
    assert_eq!(vault.get("Posts", "missing").await.unwrap(), None);
    assert!(!vault.has("Posts", "missing").await.unwrap());
}

#[tokio::test]
async fn test_put_writes_record_then_index() {
    let (vault, ledger) = mock_vault();
    let outcome = vault.put("Posts", "p1", &sample_post(1)).await.unwrap();
    assert!(outcome.is_confirmed());
    assert!(outcome.hash.is_some());
    assert_eq!(ledger.send_count(), 2);
    assert!(ledger.raw_entry("System", "Index_Posts").is_some());
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_get_all_keeps_index_order() {
    let (vault, _ledger) = mock_vault();
    for id in ["c", "a", "b"] {
        vault.put("Tasks", id, &json!({ "id": id })).await.unwrap();
    }
    let ids: Vec<Value> =
        vault.get_all("Tasks").await.unwrap().into_iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!("c"), json!("a"), json!("b")]);
}

#[tokio::test]
async fn test_get_all_skips_missing_entries() {
    let (vault, _ledger) = mock_vault();
    vault.put("Tasks", "t1", &json!({ "n": 1 })).await.unwrap();
    vault.collections().add("Tasks", "ghost").await.unwrap();
    assert_eq!(vault.get_all("Tasks").await.unwrap(), vec![json!({ "n": 1 })]);
}

#[tokio::test]
async fn test_get_all_of_unknown_collection_is_empty() {
    let (vault, ledger) = mock_vault();
    assert!(vault.get_all("Nothing").await.unwrap().is_empty());
    assert_eq!(ledger.simulate_count(), 1);
}

#[tokio::test]
async fn test_delete_drops_record_from_get_all() {
    let (vault, _ledger) = mock_vault();
    vault.put("Posts", "p1", &sample_post(1)).await.unwrap();
    vault.put("Posts", "p2", &sample_post(2)).await.unwrap();
    vault.delete("Posts", "p1").await.unwrap();
    assert_eq!(vault.get_all("Posts").await.unwrap(), vec![sample_post(2)]);
    assert_eq!(vault.get("Posts", "p1").await.unwrap(), None);
    assert!(vault.bloom_check("Posts", "p1").await.unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_get_all_returns_exactly_what_was_put(records in strategies::arb_records(8)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        runtime.block_on(async {
            let (vault, _ledger) = mock_vault();
            for (id, record) in &records {
                vault.put("Records", id, record).await.unwrap();
            }
            let all = vault.get_all("Records").await.unwrap();
            let expected: Vec<Value> = records.iter().map(|(_, r)| r.clone()).collect();
            prop_assert_eq!(all, expected);
            Ok(())
        })?;
    }
}

// ============================================================================
// Secondary indexes
// ============================================================================

#[tokio::test]
async fn test_put_with_index_resolves() {
    let (vault, _ledger) = mock_vault();
    let user = sample_user(7);
    vault.put_with_index("Users", "u7", &user, "Email", &user.email).await.unwrap();

    let found: SampleUser = vault.get_by_index_as("Users", "Email", &user.email).await.unwrap().unwrap();
    assert_eq!(found, user);
    assert_eq!(vault.get_by_index("Users", "Email", "nobody@example.org").await.unwrap(), None);
    assert_eq!(vault.get_all_as::<SampleUser>("Users").await.unwrap(), vec![user]);
}

#[tokio::test]
async fn test_secondary_index_collection_lists_values() {
    let (vault, _ledger) = mock_vault();
    vault.put_with_index("Users", "u1", &sample_user(1), "Email", "x@y.com").await.unwrap();
    vault.put_with_index("Users", "u2", &sample_user(2), "Email", "z@y.com").await.unwrap();

    assert_eq!(vault.collections().read("Users_Email_Index").await.unwrap(), vec!["x@y.com", "z@y.com"]);
    assert_eq!(vault.get_all("Users_Email_Index").await.unwrap(), vec![json!("u1"), json!("u2")]);
}

#[tokio::test]
async fn test_secondary_index_last_writer_wins() {
    let (vault, _ledger) = mock_vault();
    vault.put_with_index("Users", "u1", &sample_user(1), "Email", "shared@example.org").await.unwrap();
    vault.put_with_index("Users", "u2", &sample_user(2), "Email", "shared@example.org").await.unwrap();
    let found: SampleUser =
        vault.get_by_index_as("Users", "Email", "shared@example.org").await.unwrap().unwrap();
    assert_eq!(found, sample_user(2));
}

#[tokio::test]
async fn test_index_pointing_at_deleted_record_is_miss() {
    let (vault, _ledger) = mock_vault();
    vault.put_with_index("Users", "u1", &sample_user(1), "Email", "a@b.org").await.unwrap();
    vault.delete("Users", "u1").await.unwrap();
    assert_eq!(vault.get_by_index("Users", "Email", "a@b.org").await.unwrap(), None);
}

#[tokio::test]
async fn test_repository_over_vault() {
    let (vault, _ledger) = mock_vault();
    let users: Repository<SampleUser> = Repository::new(vault, "Users");
    let user = sample_user(3);
    users.save_indexed("u3", &user, "Email", &user.email).await.unwrap();
    assert_eq!(users.find_by("Email", &user.email).await.unwrap(), Some(user.clone()));
    assert_eq!(users.all().await.unwrap(), vec![user]);
}

// ============================================================================
// Contract accessors
// ============================================================================

#[tokio::test]
async fn test_meta_bloom_and_tiering() {
    let (vault, _ledger) = mock_vault();
    vault.put("Posts", "p1", &sample_post(1)).await.unwrap();
    vault.put_zone("Archive", "a1", &sample_post(2), StorageZone::Cold).await.unwrap();

    let meta = vault.get_meta("Posts", "p1").await.unwrap().unwrap();
    assert_eq!(meta.zone, StorageZone::Hot);
    assert_eq!(meta.version, 1);
    assert!(vault.bloom_check("Posts", "p1").await.unwrap());
    assert!(vault.has("Archive", "a1").await.unwrap());

    vault.migrate_to_cold("Posts", "p1").await.unwrap();
    assert_eq!(vault.get_meta("Posts", "p1").await.unwrap().unwrap().zone, StorageZone::Cold);

    let stats = vault.get_stats().await.unwrap();
    assert_eq!(stats.cold_entries, 2);
    assert!(stats.total_bytes_stored > 0);
    assert_eq!(vault.get_index("Archive").await.unwrap()[0].id, "a1");
}

// ============================================================================
// Corruption
// ============================================================================

#[tokio::test]
async fn test_corrupt_payload_is_error_not_miss() {
    let (vault, ledger) = mock_vault();
    vault.put("Posts", "good", &sample_post(1)).await.unwrap();
    vault.collections().add("Posts", "bad").await.unwrap();
    ledger.set_raw_entry("Posts", "bad", b"not zstd".to_vec());

    let err = vault.get("Posts", "bad").await.unwrap_err();
    assert!(matches!(err, VaultError::Decompression { .. }), "{err:?}");

    let err = vault.get_all("Posts").await.unwrap_err();
    assert!(matches!(err, VaultError::Decompression { ref id, .. } if id == "bad"), "{err:?}");
}

// ============================================================================
// Degraded mode
// ============================================================================

#[tokio::test]
async fn test_degraded_vault_never_errors_or_calls_network() {
    let (vault, ledger) = mock_vault_with(degraded_vault_config());
    assert!(!vault.contract_status().is_configured());

    assert!(vault.put("Posts", "p1", &sample_post(1)).await.unwrap().is_skipped());
    assert!(vault.put_with_index("Users", "u1", &sample_user(1), "Email", "e").await.unwrap().is_skipped());
    assert!(vault.put_with_index("Users", "u1", &sample_user(1), "E mail", "e").await.unwrap().is_skipped());
    assert!(vault.batch_put(&[("Posts", "p2", sample_post(2))]).await.unwrap().is_skipped());
    assert!(vault.delta_update("Posts", "p1", &json!({})).await.unwrap().is_skipped());
    assert!(vault.migrate_to_cold("Posts", "p1").await.unwrap().is_skipped());
    assert!(vault.delete("Posts", "p1").await.unwrap().is_skipped());

    assert_eq!(vault.get("Posts", "p1").await.unwrap(), None);
    assert!(vault.get_all("Posts").await.unwrap().is_empty());
    assert_eq!(vault.get_by_index("Users", "Email", "e").await.unwrap(), None);
    assert!(!vault.has("Posts", "p1").await.unwrap());
    assert!(!vault.bloom_check("Posts", "p1").await.unwrap());
    assert_eq!(vault.get_meta("Posts", "p1").await.unwrap(), None);
    assert!(vault.get_deltas("Posts", "p1").await.unwrap().is_empty());
    assert!(vault.get_index("Posts").await.unwrap().is_empty());
    assert_eq!(vault.get_stats().await.unwrap(), StorageStats::empty());

    assert_eq!(ledger.send_count(), 0);
    assert_eq!(ledger.simulate_count(), 0);
    assert_eq!(ledger.account_fetch_count(), 0);
}

#[tokio::test]
async fn test_degraded_put_skips_validation() {
    let (vault, _ledger) = mock_vault_with(degraded_vault_config());
    assert!(vault.put("not a collection", "", &sample_post(1)).await.unwrap().is_skipped());
}

#[tokio::test]
async fn test_shutdown_vault_rejects_writes() {
    let (vault, ledger): (Vault, _) = mock_vault();
    vault.shutdown();
    let err = vault.put("Posts", "p1", &sample_post(1)).await.unwrap_err();
    assert!(matches!(err, VaultError::Shutdown));
    assert_eq!(ledger.send_count(), 0);
}
