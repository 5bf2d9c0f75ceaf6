//! Client-maintained indexes.
//!
//! The contract has no "list" or "query" primitive, so membership and
//! field lookups are themselves stored as vault entries:
//!
//! - [`CollectionIndex`]: `System / Index_<collection>` holds the ordered,
//!   duplicate-free list of ids put into `collection`.
//! - [`SecondaryIndex`]: `<collection>_<field>_Index / <value>` holds the
//!   primary id for a field value. Last writer wins.
//!
//! Collection index entries are written with [`EntryStore::put_raw`] only,
//! so indexing an index can never recurse. Secondary index entries are
//! ordinary records: each value is listed in the index collection's own
//! `System / Index_<collection>_<field>_Index` entry.
//!
//! Both indexes use read-modify-write (or blind overwrite) with no locking.
//! Two writers updating the same collection index at once can lose an id;
//! the single admin signer is expected to be the only writer.

use chain_vault_types::{
    SYSTEM_COLLECTION, collection_index_key, secondary_index_collection,
    validation::validate_field,
};
use snafu::ResultExt;

use crate::{
    error::{InvalidInputSnafu, Result},
    store::EntryStore,
};

/// Per-collection membership list.
#[derive(Debug, Clone)]
pub struct CollectionIndex {
    store: EntryStore,
}

impl CollectionIndex {
    /// Creates an index over an entry store.
    #[must_use]
    pub fn new(store: EntryStore) -> Self {
        Self { store }
    }

    /// Reads the ids of a collection in insertion order. A missing index is
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns the read errors of [`EntryStore::get_as`].
    pub async fn read(&self, collection: &str) -> Result<Vec<String>> {
        let ids: Option<Vec<String>> =
            self.store.get_as(SYSTEM_COLLECTION, &collection_index_key(collection)).await?;
        Ok(ids.unwrap_or_default())
    }

    /// Appends `id` unless already present. Returns true if the index was
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns read errors and the write errors of [`EntryStore::put_raw`].
    pub async fn add(&self, collection: &str, id: &str) -> Result<bool> {
        let mut ids = self.read(collection).await?;
        if ids.iter().any(|existing| existing == id) {
            tracing::trace!(collection, id, "already indexed");
            return Ok(false);
        }
        ids.push(id.to_owned());
        self.write(collection, &ids).await?;
        tracing::debug!(collection, id, members = ids.len(), "collection index updated");
        Ok(true)
    }

    /// Appends every id not already present with a single rewrite.
    ///
    /// # Errors
    ///
    /// Same as [`CollectionIndex::add`].
    pub async fn add_all<'a, I>(&self, collection: &str, new_ids: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids = self.read(collection).await?;
        let before = ids.len();
        for id in new_ids {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_owned());
            }
        }
        if ids.len() == before {
            return Ok(false);
        }
        self.write(collection, &ids).await?;
        tracing::debug!(collection, added = ids.len() - before, "collection index updated");
        Ok(true)
    }

    /// Removes `id` if present. Returns true if the index was rewritten.
    ///
    /// # Errors
    ///
    /// Same as [`CollectionIndex::add`].
    pub async fn remove(&self, collection: &str, id: &str) -> Result<bool> {
        let mut ids = self.read(collection).await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.write(collection, &ids).await?;
        tracing::debug!(collection, id, members = ids.len(), "removed from collection index");
        Ok(true)
    }

    async fn write(&self, collection: &str, ids: &[String]) -> Result<()> {
        self.store.put_raw(SYSTEM_COLLECTION, &collection_index_key(collection), ids).await?;
        Ok(())
    }
}

/// Field value to primary id lookup.
#[derive(Debug, Clone)]
pub struct SecondaryIndex {
    store: EntryStore,
    listing: CollectionIndex,
}

impl SecondaryIndex {
    /// Creates an index over an entry store.
    #[must_use]
    pub fn new(store: EntryStore) -> Self {
        Self { listing: CollectionIndex::new(store.clone()), store }
    }

    /// Returns the collection holding the `field` index of `collection`.
    #[must_use]
    pub fn collection_for(collection: &str, field: &str) -> String {
        secondary_index_collection(collection, field)
    }

    /// Points `value` at `id`, overwriting any previous mapping.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad field name, plus the write errors of
    /// [`EntryStore::put_raw`] and [`CollectionIndex::add`].
    pub async fn link(&self, collection: &str, field: &str, value: &str, id: &str) -> Result<()> {
        validate_field(field, self.store.client().config().validation()).context(InvalidInputSnafu)?;
        let index = Self::collection_for(collection, field);
        let outcome = self.store.put_raw(&index, value, id).await?;
        if !outcome.is_skipped() {
            self.listing.add(&index, value).await?;
        }
        tracing::debug!(index = %index, value, id, "secondary index updated");
        Ok(())
    }

    /// Resolves `value` to the primary id it was last linked to.
    ///
    /// # Errors
    ///
    /// Returns the read errors of [`EntryStore::get_as`].
    pub async fn resolve(&self, collection: &str, field: &str, value: &str) -> Result<Option<String>> {
        let id: Option<String> = self.store.get_as(&Self::collection_for(collection, field), value).await?;
        Ok(id.filter(|id| !id.is_empty()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::{PollPolicy, VaultConfig},
        error::VaultError,
        ledger::LedgerClient,
        mock::MockLedger,
        signer::Keypair,
    };

    const CONTRACT: &str = "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC";

    fn store(mock: &Arc<MockLedger>) -> EntryStore {
        let config = VaultConfig::builder()
            .with_contract_id(CONTRACT)
            .with_admin_secret(Keypair::from_seed([5; 32]).secret())
            .with_poll_policy(PollPolicy { max_polls: 2, interval: Duration::from_millis(5) })
            .build()
            .unwrap();
        EntryStore::new(LedgerClient::new(config, mock.clone()))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let mock = Arc::new(MockLedger::new());
        let index = CollectionIndex::new(store(&mock));
        assert!(index.add("Posts", "p1").await.unwrap());
        assert!(!index.add("Posts", "p1").await.unwrap());
        assert!(index.add("Posts", "p2").await.unwrap());
        assert_eq!(index.read("Posts").await.unwrap(), vec!["p1", "p2"]);
        assert_eq!(mock.send_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_index_reads_empty() {
        let mock = Arc::new(MockLedger::new());
        let index = CollectionIndex::new(store(&mock));
        assert!(index.read("Nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_all_and_remove() {
        let mock = Arc::new(MockLedger::new());
        let index = CollectionIndex::new(store(&mock));
        index.add("Tasks", "t1").await.unwrap();
        assert!(index.add_all("Tasks", ["t1", "t2", "t3", "t2"]).await.unwrap());
        assert!(!index.add_all("Tasks", ["t3"]).await.unwrap());
        assert!(index.remove("Tasks", "t2").await.unwrap());
        assert!(!index.remove("Tasks", "t2").await.unwrap());
        assert_eq!(index.read("Tasks").await.unwrap(), vec!["t1", "t3"]);
    }

    #[tokio::test]
    async fn test_index_stored_under_system() {
        let mock = Arc::new(MockLedger::new());
        CollectionIndex::new(store(&mock)).add("NGOs", "n1").await.unwrap();
        assert!(mock.raw_entry("System", "Index_NGOs").is_some());
        assert!(mock.raw_entry("System", "Index_System").is_none());
    }

    #[tokio::test]
    async fn test_secondary_link_and_resolve() {
        let mock = Arc::new(MockLedger::new());
        let index = SecondaryIndex::new(store(&mock));
        index.link("Users", "Email", "x@y.com", "u1").await.unwrap();
        assert_eq!(index.resolve("Users", "Email", "x@y.com").await.unwrap().as_deref(), Some("u1"));
        assert_eq!(index.resolve("Users", "Email", "other@y.com").await.unwrap(), None);

        index.link("Users", "Email", "x@y.com", "u2").await.unwrap();
        assert_eq!(index.resolve("Users", "Email", "x@y.com").await.unwrap().as_deref(), Some("u2"));
        assert!(mock.raw_entry("Users_Email_Index", "x@y.com").is_some());
    }

    #[tokio::test]
    async fn test_secondary_values_are_listed() {
        let mock = Arc::new(MockLedger::new());
        let store = store(&mock);
        let index = SecondaryIndex::new(store.clone());
        index.link("Users", "Email", "a@y.com", "u1").await.unwrap();
        index.link("Users", "Email", "b@y.com", "u2").await.unwrap();
        index.link("Users", "Email", "a@y.com", "u3").await.unwrap();

        let listed = CollectionIndex::new(store).read("Users_Email_Index").await.unwrap();
        assert_eq!(listed, vec!["a@y.com", "b@y.com"]);
        assert!(mock.raw_entry("System", "Index_Users_Email_Index").is_some());
    }

    #[tokio::test]
    async fn test_secondary_rejects_bad_field() {
        let mock = Arc::new(MockLedger::new());
        let err = SecondaryIndex::new(store(&mock)).link("Users", "E mail", "x", "u1").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput { .. }));
        assert_eq!(mock.send_count(), 0);
    }

    #[test]
    fn test_collection_for() {
        assert_eq!(SecondaryIndex::collection_for("Users", "Email"), "Users_Email_Index");
    }
}
