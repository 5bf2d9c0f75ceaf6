//! Compressed entry reads and writes.
//!
//! [`EntryStore`] is the bottom of the vault: it turns a record into a
//! compressed payload and back, and maps the contract's `put` / `get` onto
//! [`LedgerClient`] calls. It never touches any index.

use chain_vault_types::{
    StorageZone, decompress,
    validation::{validate_collection, validate_id, validate_payload},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::ResultExt;

use crate::{
    error::{CodecSnafu, DecompressionSnafu, InvalidInputSnafu, RecordShapeSnafu, Result},
    ledger::{LedgerClient, SubmitOutcome},
    scval::{IntoScVal, ScVal},
};

/// Raw entry access over a [`LedgerClient`].
#[derive(Debug, Clone)]
pub struct EntryStore {
    client: LedgerClient,
}

impl EntryStore {
    /// Creates a store over a ledger client.
    #[must_use]
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Returns the underlying ledger client.
    #[must_use]
    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    /// Validates the key, then compresses `record` into a payload within the
    /// entry budget.
    pub(crate) fn encode<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<Vec<u8>> {
        let limits = self.client.config().validation();
        validate_collection(collection, limits).context(InvalidInputSnafu)?;
        validate_id(id, limits).context(InvalidInputSnafu)?;

        let envelope = chain_vault_types::compress(record).context(CodecSnafu)?;
        tracing::info!(
            collection,
            id,
            original_bytes = envelope.original_size,
            compressed_bytes = envelope.compressed_size,
            ratio = envelope.ratio(),
            "record compressed"
        );
        self.client.config().metrics().record_compression(
            collection,
            envelope.original_size as usize,
            envelope.compressed_size as usize,
        );

        validate_payload(&envelope.buffer, limits).context(InvalidInputSnafu)?;
        Ok(envelope.buffer)
    }

    /// Writes a record without touching any index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad key or oversized payload, `Codec` if
    /// the record cannot be serialized, and any submission error from
    /// [`LedgerClient::submit_call`]. Never fails when the client is degraded.
    pub async fn put_raw<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<SubmitOutcome> {
        if !self.client.can_write() {
            tracing::warn!(collection, id, "vault contract or admin signer not configured, skipping put");
            return Ok(SubmitOutcome::skipped());
        }
        let payload = self.encode(collection, id, record)?;
        self.client.submit_call("put", vec![collection.into_scval(), id.into_scval(), ScVal::Bytes(payload)]).await
    }

    /// Writes a record into an explicit storage tier without touching any index.
    ///
    /// # Errors
    ///
    /// Same as [`EntryStore::put_raw`].
    pub async fn put_zone_raw<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
        zone: StorageZone,
    ) -> Result<SubmitOutcome> {
        if !self.client.can_write() {
            tracing::warn!(collection, id, %zone, "vault contract or admin signer not configured, skipping put");
            return Ok(SubmitOutcome::skipped());
        }
        let payload = self.encode(collection, id, record)?;
        self.client
            .submit_call(
                "put_zone",
                vec![collection.into_scval(), id.into_scval(), ScVal::Bytes(payload), zone.into_scval()],
            )
            .await
    }

    /// Reads the stored payload of an entry. An empty or non-bytes result is
    /// a miss.
    ///
    /// # Errors
    ///
    /// Returns `Simulation`, `Transport` or `Rpc` when the read itself fails.
    pub async fn get_bytes(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>> {
        let result = self.client.simulate_call("get", vec![collection.into_scval(), id.into_scval()]).await?;
        match result {
            Some(ScVal::Bytes(bytes)) if !bytes.is_empty() => Ok(Some(bytes)),
            Some(other) => {
                tracing::trace!(collection, id, kind = other.kind(), "no payload stored");
                Ok(None)
            },
            None => Ok(None),
        }
    }

    /// Reads and decompresses an entry as a generic JSON value.
    ///
    /// # Errors
    ///
    /// Returns `Decompression` when a payload exists but is corrupt, plus the
    /// read errors of [`EntryStore::get_bytes`].
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let Some(payload) = self.get_bytes(collection, id).await? else {
            return Ok(None);
        };
        let metrics = self.client.config().metrics();

        match decompress(&payload) {
            Ok(Some(decoded)) => {
                tracing::debug!(
                    collection,
                    id,
                    compressed_bytes = decoded.compressed_size,
                    original_bytes = decoded.decompressed_size,
                    "record decompressed"
                );
                metrics.record_decompression(collection, true);
                Ok(Some(decoded.value))
            },
            Ok(None) => Ok(None),
            Err(source) => {
                tracing::error!(collection, id, error = %source, "stored payload is corrupt");
                metrics.record_decompression(collection, false);
                Err(source).context(DecompressionSnafu { collection, id })
            },
        }
    }

    /// Reads an entry and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns `RecordShape` when the stored JSON does not match `T`, plus
    /// the errors of [`EntryStore::get`].
    pub async fn get_as<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        match self.get(collection, id).await? {
            Some(value) => serde_json::from_value(value).map(Some).context(RecordShapeSnafu { collection, id }),
            None => Ok(None),
        }
    }
}
