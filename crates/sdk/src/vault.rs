//! The vault facade.
//!
//! [`Vault`] is the whole storage surface domain code sees: compressed
//! record writes and reads, collection listing, secondary index lookups,
//! and the contract's metadata, bloom, stats, tiering and delete calls.
//!
//! # Degraded mode
//!
//! Without a usable contract id every method succeeds: writes log and
//! return a skipped outcome, reads return `None`, empty lists, `false` or
//! [`StorageStats::empty`]. No network call is made.
//!
//! # Consistency
//!
//! [`Vault::put`] writes the record, then rewrites the collection index.
//! [`Vault::put_with_index`] adds a third, independent write. A failure
//! between them leaves the record stored but unlisted or unindexed; there is
//! no multi-key transaction.

use std::collections::HashMap;

use chain_vault_types::{
    ChunkMeta, IndexEntry, SYSTEM_COLLECTION, StorageStats, StorageZone, decompress,
    validation::validate_field,
};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::ResultExt;

use crate::{
    config::{ContractStatus, VaultConfig},
    error::{DecompressionSnafu, InvalidInputSnafu, Result, VaultError},
    index::{CollectionIndex, SecondaryIndex},
    ledger::{LedgerClient, SubmitOutcome},
    scval::{FromScVal, IntoScVal, ScVal},
    store::EntryStore,
};

/// Compressed, indexed record storage over the vault contract.
#[derive(Debug, Clone)]
pub struct Vault {
    client: LedgerClient,
    store: EntryStore,
    collections: CollectionIndex,
    secondary: SecondaryIndex,
}

impl Vault {
    /// Creates a vault over a ledger client.
    #[must_use]
    pub fn new(client: LedgerClient) -> Self {
        let store = EntryStore::new(client.clone());
        Self {
            collections: CollectionIndex::new(store.clone()),
            secondary: SecondaryIndex::new(store.clone()),
            store,
            client,
        }
    }

    /// Creates a vault talking JSON-RPC to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Transport` if the HTTP client cannot be built.
    pub fn connect(config: VaultConfig) -> Result<Self> {
        LedgerClient::connect(config).map(Self::new)
    }

    /// Returns the ledger client.
    #[must_use]
    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    /// Returns the collection index.
    #[must_use]
    pub fn collections(&self) -> &CollectionIndex {
        &self.collections
    }

    /// Returns whether a contract is configured.
    #[must_use]
    pub fn contract_status(&self) -> &ContractStatus {
        self.client.contract_status()
    }

    /// Cancels in-flight writes and rejects further calls.
    pub fn shutdown(&self) {
        self.client.shutdown();
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stores a record and lists `id` in the collection index.
    ///
    /// Overwrites any existing record under the same key. Entries of the
    /// `System` collection are never listed.
    ///
    /// # Errors
    ///
    /// Returns validation, codec and submission errors from either write.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<SubmitOutcome> {
        let outcome = self.store.put_raw(collection, id, record).await?;
        self.list(collection, id, &outcome).await?;
        Ok(outcome)
    }

    /// Stores a record without touching the collection index.
    ///
    /// # Errors
    ///
    /// Same as [`EntryStore::put_raw`].
    pub async fn put_raw<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<SubmitOutcome> {
        self.store.put_raw(collection, id, record).await
    }

    /// Stores a record into an explicit storage tier and lists it.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::put`].
    pub async fn put_zone<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
        zone: StorageZone,
    ) -> Result<SubmitOutcome> {
        let outcome = self.store.put_zone_raw(collection, id, record, zone).await?;
        self.list(collection, id, &outcome).await?;
        Ok(outcome)
    }

    async fn list(&self, collection: &str, id: &str, outcome: &SubmitOutcome) -> Result<()> {
        if outcome.is_skipped() || collection == SYSTEM_COLLECTION {
            return Ok(());
        }
        self.collections.add(collection, id).await?;
        Ok(())
    }

    /// Stores a record and points `field = value` at it.
    ///
    /// Two listed puts, each a separate write: the record into `collection`,
    /// then `id` under `value` in `<collection>_<field>_Index`. Nothing is
    /// rolled back if the second fails.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::put`], plus `InvalidInput` for a bad field name
    /// (checked before anything is written). Without a writable contract
    /// nothing is checked and the call is skipped.
    pub async fn put_with_index<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
        field: &str,
        value: &str,
    ) -> Result<SubmitOutcome> {
        if !self.client.can_write() {
            tracing::warn!(collection, id, field, "vault contract or admin signer not configured, skipping indexed put");
            return Ok(SubmitOutcome::skipped());
        }
        validate_field(field, self.client.config().validation()).context(InvalidInputSnafu)?;
        let outcome = self.put(collection, id, record).await?;
        if !outcome.is_skipped() {
            self.secondary.link(collection, field, value, id).await?;
        }
        Ok(outcome)
    }

    /// Stores several records with one contract call, then lists the new
    /// ids once per collection. An empty batch sends nothing.
    ///
    /// # Errors
    ///
    /// Returns validation and codec errors before anything is sent, then
    /// submission errors.
    pub async fn batch_put<T: Serialize>(&self, entries: &[(&str, &str, T)]) -> Result<SubmitOutcome> {
        if entries.is_empty() || !self.client.can_write() {
            if !entries.is_empty() {
                tracing::warn!(entries = entries.len(), "vault contract or admin signer not configured, skipping batch put");
            }
            return Ok(SubmitOutcome::skipped());
        }

        let mut collections = Vec::with_capacity(entries.len());
        let mut ids = Vec::with_capacity(entries.len());
        let mut payloads = Vec::with_capacity(entries.len());
        for (collection, id, record) in entries {
            payloads.push(ScVal::Bytes(self.store.encode(collection, id, record)?));
            collections.push(collection.into_scval());
            ids.push(id.into_scval());
        }

        let outcome = self
            .client
            .submit_call("batch_put", vec![ScVal::Vec(collections), ScVal::Vec(ids), ScVal::Vec(payloads)])
            .await?;
        if outcome.is_skipped() {
            return Ok(outcome);
        }

        let mut by_collection: Vec<(&str, Vec<&str>)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for &(collection, id, _) in entries {
            if collection == SYSTEM_COLLECTION {
                continue;
            }
            let slot = *positions.entry(collection).or_insert_with(|| {
                by_collection.push((collection, Vec::new()));
                by_collection.len() - 1
            });
            by_collection[slot].1.push(id);
        }
        for (collection, ids) in by_collection {
            self.collections.add_all(collection, ids).await?;
        }

        tracing::info!(entries = entries.len(), hash = ?outcome.hash, "batch stored");
        Ok(outcome)
    }

    /// Appends a compressed patch to an entry's delta log and bumps its
    /// version. The stored record itself is unchanged and [`Vault::get`]
    /// never applies deltas.
    ///
    /// # Errors
    ///
    /// Returns validation, codec and submission errors. The contract rejects
    /// a patch for a missing entry.
    pub async fn delta_update<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        patch: &T,
    ) -> Result<SubmitOutcome> {
        if !self.client.can_write() {
            tracing::warn!(collection, id, "vault contract or admin signer not configured, skipping delta update");
            return Ok(SubmitOutcome::skipped());
        }
        let payload = self.store.encode(collection, id, patch)?;
        self.client
            .submit_call("delta_update", vec![collection.into_scval(), id.into_scval(), ScVal::Bytes(payload)])
            .await
    }

    /// Moves an entry to the cold tier. A no-op for missing or already cold
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns submission errors.
    pub async fn migrate_to_cold(&self, collection: &str, id: &str) -> Result<SubmitOutcome> {
        let outcome =
            self.client.submit_call("migrate_to_cold", vec![collection.into_scval(), id.into_scval()]).await?;
        if !outcome.is_skipped() {
            tracing::info!(collection, id, hash = ?outcome.hash, "migrated to cold storage");
        }
        Ok(outcome)
    }

    /// Deletes an entry and drops it from the collection index.
    ///
    /// Secondary index entries pointing at it are left in place and resolve
    /// to a miss.
    ///
    /// # Errors
    ///
    /// Returns submission errors from either write.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<SubmitOutcome> {
        let outcome = self.client.submit_call("delete", vec![collection.into_scval(), id.into_scval()]).await?;
        if outcome.is_skipped() {
            return Ok(outcome);
        }
        tracing::info!(collection, id, hash = ?outcome.hash, "entry deleted");
        if collection != SYSTEM_COLLECTION {
            self.collections.remove(collection, id).await?;
        }
        Ok(outcome)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads a record as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Decompression` for a corrupt payload and read errors.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.store.get(collection, id).await
    }

    /// Reads a record as `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get`], plus `RecordShape`.
    pub async fn get_as<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.store.get_as(collection, id).await
    }

    /// Reads every listed record of a collection, in index order.
    ///
    /// Ids whose record is missing are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first read or decompression error.
    pub async fn get_all(&self, collection: &str) -> Result<Vec<Value>> {
        let ids = self.collections.read(collection).await?;
        let records: Vec<Option<Value>> = stream::iter(ids)
            .map(|id| async move { self.store.get(collection, &id).await })
            .buffered(self.client.config().read_concurrency())
            .try_collect()
            .await?;
        Ok(records.into_iter().flatten().collect())
    }

    /// Typed variant of [`Vault::get_all`].
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_all`], plus `RecordShape`.
    pub async fn get_all_as<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let ids = self.collections.read(collection).await?;
        let records: Vec<Option<T>> = stream::iter(ids)
            .map(|id| async move { self.store.get_as::<T>(collection, &id).await })
            .buffered(self.client.config().read_concurrency())
            .try_collect()
            .await?;
        Ok(records.into_iter().flatten().collect())
    }

    /// Looks up a record through a secondary index. A miss at either step is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get`].
    pub async fn get_by_index(&self, collection: &str, field: &str, value: &str) -> Result<Option<Value>> {
        match self.secondary.resolve(collection, field, value).await? {
            Some(id) => self.store.get(collection, &id).await,
            None => Ok(None),
        }
    }

    /// Typed variant of [`Vault::get_by_index`].
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_as`].
    pub async fn get_by_index_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<T>> {
        match self.secondary.resolve(collection, field, value).await? {
            Some(id) => self.store.get_as(collection, &id).await,
            None => Ok(None),
        }
    }

    // =========================================================================
    // Contract accessors
    // =========================================================================

    /// Reads an accessor, treating a failed simulation as "no value".
    async fn read_accessor<T: FromScVal>(&self, method: &str, args: Vec<ScVal>) -> Result<Option<T>> {
        match self.client.simulate_as::<T>(method, args).await {
            Err(VaultError::Simulation { message, .. }) => {
                tracing::warn!(method, error = %message, "simulation failed, returning default");
                Ok(None)
            },
            other => other,
        }
    }

    /// Reads the contract metadata of an entry.
    ///
    /// # Errors
    ///
    /// Returns transport errors and `ScValDecode` for an unexpected result.
    pub async fn get_meta(&self, collection: &str, id: &str) -> Result<Option<ChunkMeta>> {
        self.read_accessor("get_meta", vec![collection.into_scval(), id.into_scval()]).await
    }

    /// Reads the raw delta payloads of an entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns transport errors and `ScValDecode` for an unexpected result.
    pub async fn get_delta_payloads(&self, collection: &str, id: &str) -> Result<Vec<Vec<u8>>> {
        let deltas: Option<Vec<ScVal>> =
            self.read_accessor("get_deltas", vec![collection.into_scval(), id.into_scval()]).await?;
        deltas.unwrap_or_default().into_iter().map(ScVal::into_bytes).collect()
    }

    /// Reads and decompresses the delta log of an entry, oldest first.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_delta_payloads`], plus `Decompression` for a
    /// corrupt patch.
    pub async fn get_deltas(&self, collection: &str, id: &str) -> Result<Vec<Value>> {
        let mut patches = Vec::new();
        for payload in self.get_delta_payloads(collection, id).await? {
            if let Some(decoded) = decompress(&payload).context(DecompressionSnafu { collection, id })? {
                patches.push(decoded.value);
            }
        }
        Ok(patches)
    }

    /// Probabilistic membership: `false` means definitely absent.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn bloom_check(&self, collection: &str, id: &str) -> Result<bool> {
        let hit = self.read_accessor("bloom_check", vec![collection.into_scval(), id.into_scval()]).await?;
        Ok(hit.unwrap_or(false))
    }

    /// Definitive existence check against contract storage.
    ///
    /// # Errors
    ///
    /// Returns transport errors.
    pub async fn has(&self, collection: &str, id: &str) -> Result<bool> {
        let found = self.read_accessor("has", vec![collection.into_scval(), id.into_scval()]).await?;
        Ok(found.unwrap_or(false))
    }

    /// Reads the contract-side index rows of a collection.
    ///
    /// # Errors
    ///
    /// Returns transport errors and `ScValDecode` for an unexpected result.
    pub async fn get_index(&self, collection: &str) -> Result<Vec<IndexEntry>> {
        let entries = self.read_accessor("get_index", vec![collection.into_scval()]).await?;
        Ok(entries.unwrap_or_default())
    }

    /// Reads global storage statistics.
    ///
    /// # Errors
    ///
    /// Returns transport errors and `ScValDecode` for an unexpected result.
    pub async fn get_stats(&self) -> Result<StorageStats> {
        let stats = self.read_accessor("get_stats", Vec::new()).await?;
        Ok(stats.unwrap_or_else(StorageStats::empty))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;

    use super::*;
    use crate::{config::PollPolicy, mock::MockLedger, signer::Keypair};

    const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    fn vault(mock: &Arc<MockLedger>) -> Vault {
        let config = VaultConfig::builder()
            .with_contract_id(CONTRACT)
            .with_admin_secret(Keypair::from_seed([6; 32]).secret())
            .with_poll_policy(PollPolicy { max_polls: 2, interval: Duration::from_millis(5) })
            .build()
            .unwrap();
        Vault::new(LedgerClient::new(config, mock.clone()))
    }

    #[tokio::test]
    async fn test_put_lists_id_once() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        vault.put("Posts", "p1", &json!({ "n": 1 })).await.unwrap();
        vault.put("Posts", "p1", &json!({ "n": 2 })).await.unwrap();
        assert_eq!(vault.collections().read("Posts").await.unwrap(), vec!["p1"]);
        assert_eq!(vault.get("Posts", "p1").await.unwrap(), Some(json!({ "n": 2 })));
        // put, index, put (index unchanged)
        assert_eq!(mock.send_count(), 3);
    }

    #[tokio::test]
    async fn test_system_puts_are_not_listed() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        vault.put("System", "config", &json!({ "v": 1 })).await.unwrap();
        assert!(mock.raw_entry("System", "Index_System").is_none());
        assert_eq!(mock.send_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_put_lists_each_collection_once() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        let entries =
            [("Tasks", "t1", json!({ "a": 1 })), ("Tasks", "t2", json!({ "a": 2 })), ("NGOs", "n1", json!({}))];
        vault.batch_put(&entries).await.unwrap();
        assert_eq!(vault.collections().read("Tasks").await.unwrap(), vec!["t1", "t2"]);
        assert_eq!(vault.collections().read("NGOs").await.unwrap(), vec!["n1"]);
        // batch, two index rewrites
        assert_eq!(mock.send_count(), 3);
        assert_eq!(vault.get_stats().await.unwrap().total_entries, 5);
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let mock = Arc::new(MockLedger::new());
        let entries: [(&str, &str, Value); 0] = [];
        assert!(vault(&mock).batch_put(&entries).await.unwrap().is_skipped());
        assert_eq!(mock.send_count(), 0);
    }

    #[tokio::test]
    async fn test_delta_update_appends_and_bumps_version() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        vault.put("Missions", "m1", &json!({ "status": "open" })).await.unwrap();
        vault.delta_update("Missions", "m1", &json!({ "status": "done" })).await.unwrap();
        assert_eq!(vault.get_deltas("Missions", "m1").await.unwrap(), vec![json!({ "status": "done" })]);
        assert_eq!(vault.get_meta("Missions", "m1").await.unwrap().unwrap().version, 2);
        assert_eq!(vault.get("Missions", "m1").await.unwrap(), Some(json!({ "status": "open" })));
    }

    #[tokio::test]
    async fn test_delta_update_missing_entry_fails() {
        let mock = Arc::new(MockLedger::new());
        let err = vault(&mock).delta_update("Missions", "nope", &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Entry not found"), "{err}");
    }

    #[tokio::test]
    async fn test_migrate_to_cold_updates_meta_and_index() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        vault.put("Archive", "a1", &json!({ "old": true })).await.unwrap();
        vault.migrate_to_cold("Archive", "a1").await.unwrap();
        assert_eq!(vault.get_meta("Archive", "a1").await.unwrap().unwrap().zone, StorageZone::Cold);
        let rows = vault.get_index("Archive").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].zone, StorageZone::Cold);
        let stats = vault.get_stats().await.unwrap();
        assert_eq!(stats.cold_entries, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_listing() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        vault.put("Posts", "p1", &json!({ "n": 1 })).await.unwrap();
        vault.put("Posts", "p2", &json!({ "n": 2 })).await.unwrap();
        vault.delete("Posts", "p1").await.unwrap();
        assert!(!vault.has("Posts", "p1").await.unwrap());
        assert!(vault.bloom_check("Posts", "p1").await.unwrap());
        assert_eq!(vault.get("Posts", "p1").await.unwrap(), None);
        assert_eq!(vault.get_all("Posts").await.unwrap(), vec![json!({ "n": 2 })]);
    }

    #[tokio::test]
    async fn test_accessors_default_on_simulation_error() {
        let mock = Arc::new(MockLedger::new());
        let vault = vault(&mock);
        mock.inject_simulation_error(4);
        assert_eq!(vault.get_stats().await.unwrap(), StorageStats::empty());
        assert!(!vault.has("Posts", "p1").await.unwrap());
        assert!(vault.get_index("Posts").await.unwrap().is_empty());
        assert_eq!(vault.get_meta("Posts", "p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_simulation_error_is_raised() {
        let mock = Arc::new(MockLedger::new());
        mock.inject_simulation_error(1);
        let err = vault(&mock).get("Posts", "p1").await.unwrap_err();
        assert!(matches!(err, VaultError::Simulation { .. }));
    }
}
