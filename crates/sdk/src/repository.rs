//! Typed collections.
//!
//! A [`Repository`] binds a record type to one collection so domain code
//! (escrow, missions, token balances, treasury movements) reads and writes
//! plain structs instead of JSON. It adds no rules of its own.
//!
//! ```no_run
//! use chain_vault_sdk::{Repository, Vault};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Mission {
//!     title: String,
//!     reward: u64,
//! }
//!
//! # async fn example(vault: Vault) -> chain_vault_sdk::Result<()> {
//! let missions: Repository<Mission> = Repository::new(vault, "Missions");
//! missions.save("m1", &Mission { title: "Clear the river".to_owned(), reward: 50 }).await?;
//! let open = missions.all().await?;
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};

use crate::{error::Result, ledger::SubmitOutcome, vault::Vault};

/// A vault collection holding records of type `T`.
#[derive(Debug)]
pub struct Repository<T> {
    vault: Vault,
    collection: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { vault: self.vault.clone(), collection: self.collection.clone(), _record: PhantomData }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Binds `collection` on `vault`.
    pub fn new(vault: Vault, collection: impl Into<String>) -> Self {
        Self { vault, collection: collection.into(), _record: PhantomData }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Stores a record and lists it.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::put`].
    pub async fn save(&self, id: &str, record: &T) -> Result<SubmitOutcome> {
        self.vault.put(&self.collection, id, record).await
    }

    /// Stores a record with a secondary index on `field = value`.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::put_with_index`].
    pub async fn save_indexed(&self, id: &str, record: &T, field: &str, value: &str) -> Result<SubmitOutcome> {
        self.vault.put_with_index(&self.collection, id, record, field, value).await
    }

    /// Reads a record by id.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_as`].
    pub async fn find(&self, id: &str) -> Result<Option<T>> {
        self.vault.get_as(&self.collection, id).await
    }

    /// Reads a record through a secondary index.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_by_index_as`].
    pub async fn find_by(&self, field: &str, value: &str) -> Result<Option<T>> {
        self.vault.get_by_index_as(&self.collection, field, value).await
    }

    /// Reads every listed record.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::get_all_as`].
    pub async fn all(&self) -> Result<Vec<T>> {
        self.vault.get_all_as(&self.collection).await
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::delete`].
    pub async fn remove(&self, id: &str) -> Result<SubmitOutcome> {
        self.vault.delete(&self.collection, id).await
    }
}
