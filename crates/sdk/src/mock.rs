//! In-process mock ledger for tests.
//!
//! [`MockLedger`] implements [`LedgerRpc`] and models both the network (account
//! sequences, signature checks, transaction status) and the vault contract
//! (chunks, metadata, per-collection index, bloom filter, stats, delta log,
//! hot/cold migration, delete).
//!
//! # Features
//!
//! - **Sequence enforcement**: a transaction must carry `account sequence + 1`
//! - **Failure injection**: bad-sequence rejections, arbitrary send errors,
//!   slow confirmation, never-confirming transactions, simulation errors
//! - **Request counting**: sends, simulations and account fetches
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chain_vault_sdk::{LedgerClient, Vault, VaultConfig, mock::MockLedger};
//!
//! # async fn example(config: VaultConfig) -> chain_vault_sdk::Result<()> {
//! let ledger = Arc::new(MockLedger::new());
//! ledger.inject_bad_sequence(1);
//!
//! let vault = Vault::new(LedgerClient::new(config, ledger.clone()));
//! vault.put("Posts", "p1", &serde_json::json!({ "Title": "Flood Relief" })).await?;
//! assert_eq!(ledger.send_count(), 3); // rejected put, put, index update
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chain_vault_types::{
    ChunkMeta, CompressionAlgo, IndexEntry, StorageStats, StorageZone,
};
use parking_lot::{Mutex, RwLock};

use crate::{
    config::TESTNET_PASSPHRASE,
    error::{Result, RpcSnafu},
    rpc::{
        AccountState, LedgerRpc, SendResponse, SendStatus, SignedTransaction, SimulationResponse,
        Transaction, TransactionStatus,
    },
    scval::{FromScVal, IntoScVal, ScVal},
    signer,
};

/// Bloom filter size in bytes.
pub const BLOOM_SIZE_BYTES: usize = 2048;
const BLOOM_SIZE_BITS: u64 = (BLOOM_SIZE_BYTES * 8) as u64;
/// Number of bloom hash functions.
pub const BLOOM_K: u64 = 7;
/// Bloom hash seed set at contract initialization.
pub const BLOOM_SEED: u64 = 42;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Ledger timestamp of the first applied transaction.
const GENESIS_TIME: u64 = 1_700_000_000;
/// Seconds between applied transactions.
const LEDGER_CLOSE_SECS: u64 = 5;

type EntryKey = (String, String);

fn key(collection: &str, id: &str) -> EntryKey {
    (collection.to_owned(), id.to_owned())
}

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(hash, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

fn checksum(data: &[u8]) -> u64 {
    fnv1a(FNV_OFFSET, data)
}

fn size_u32(data: &[u8]) -> u32 {
    u32::try_from(data.len()).unwrap_or(u32::MAX)
}

// =============================================================================
// Contract model
// =============================================================================

/// Storage of the vault contract.
#[derive(Debug)]
struct ContractState {
    chunks: HashMap<EntryKey, Vec<u8>>,
    meta: HashMap<EntryKey, ChunkMeta>,
    index: HashMap<String, Vec<IndexEntry>>,
    deltas: HashMap<EntryKey, Vec<Vec<u8>>>,
    bloom: Vec<u8>,
    stats: StorageStats,
}

impl Default for ContractState {
    fn default() -> Self {
        Self {
            chunks: HashMap::new(),
            meta: HashMap::new(),
            index: HashMap::new(),
            deltas: HashMap::new(),
            bloom: vec![0; BLOOM_SIZE_BYTES],
            stats: StorageStats::empty(),
        }
    }
}

impl ContractState {
    fn bloom_positions(collection: &str, id: &str) -> impl Iterator<Item = (usize, u8)> {
        let mut hash = fnv1a(FNV_OFFSET, &BLOOM_SEED.to_le_bytes());
        hash = fnv1a(hash, collection.as_bytes());
        hash = fnv1a(hash, &[0xff]);
        hash = fnv1a(hash, id.as_bytes());
        let step = hash >> 16;
        (0..BLOOM_K).map(move |i| {
            let bit = hash.wrapping_add(i.wrapping_mul(step)) % BLOOM_SIZE_BITS;
            ((bit / 8) as usize, 1u8 << (bit % 8))
        })
    }

    fn bloom_add(&mut self, collection: &str, id: &str) {
        for (byte, mask) in Self::bloom_positions(collection, id) {
            self.bloom[byte] |= mask;
        }
    }

    fn bloom_check(&self, collection: &str, id: &str) -> bool {
        Self::bloom_positions(collection, id).all(|(byte, mask)| self.bloom[byte] & mask != 0)
    }

    fn index_upsert(&mut self, collection: &str, id: &str, meta: &ChunkMeta) {
        let entry = IndexEntry {
            id: id.to_owned(),
            zone: meta.zone,
            compressed_size: meta.compressed_size,
            version: meta.version,
        };
        let index = self.index.entry(collection.to_owned()).or_default();
        match index.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => index.push(entry),
        }
    }

    /// Counts every write as a new entry, as the contract does.
    fn stats_update(&mut self, stored: u64, original: u64, is_add: bool, is_hot: bool) {
        let stats = &mut self.stats;
        if is_add {
            stats.total_entries += 1;
            if is_hot {
                stats.hot_entries += 1;
            } else {
                stats.cold_entries += 1;
            }
            stats.total_bytes_stored += stored;
            stats.total_bytes_original += original;
        } else {
            stats.total_entries = stats.total_entries.saturating_sub(1);
            if is_hot {
                stats.hot_entries = stats.hot_entries.saturating_sub(1);
            } else {
                stats.cold_entries = stats.cold_entries.saturating_sub(1);
            }
            stats.total_bytes_stored = stats.total_bytes_stored.saturating_sub(stored);
            stats.total_bytes_original = stats.total_bytes_original.saturating_sub(original);
        }
        if stats.total_bytes_original > 0 {
            let kept = stats.total_bytes_stored * 100 / stats.total_bytes_original;
            stats.compression_ratio = u32::try_from(100u64.saturating_sub(kept)).unwrap_or(0);
        }
    }

    fn put(&mut self, collection: &str, id: &str, data: Vec<u8>, zone: StorageZone, now: u64) {
        let len = size_u32(&data);
        let meta = ChunkMeta {
            compression: CompressionAlgo::Zstd,
            original_size: len.saturating_mul(4),
            compressed_size: len,
            checksum: checksum(&data),
            zone,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.bloom_add(collection, id);
        self.index_upsert(collection, id, &meta);
        self.stats_update(
            u64::from(len),
            u64::from(meta.original_size),
            true,
            zone == StorageZone::Hot,
        );
        self.chunks.insert(key(collection, id), data);
        self.meta.insert(key(collection, id), meta);
    }

    fn delta_update(&mut self, collection: &str, id: &str, patch: Vec<u8>, now: u64) -> std::result::Result<(), String> {
        let k = key(collection, id);
        if !self.chunks.contains_key(&k) {
            return Err("Entry not found for delta update".to_owned());
        }
        self.deltas.entry(k.clone()).or_default().push(patch);
        if let Some(meta) = self.meta.get_mut(&k) {
            meta.version += 1;
            meta.updated_at = now;
        }
        Ok(())
    }

    fn migrate_to_cold(&mut self, collection: &str, id: &str, now: u64) {
        let Some(meta) = self.meta.get_mut(&key(collection, id)) else {
            return;
        };
        if meta.zone == StorageZone::Cold {
            return;
        }
        meta.zone = StorageZone::Cold;
        meta.updated_at = now;
        let meta = meta.clone();
        self.index_upsert(collection, id, &meta);
        self.stats.hot_entries = self.stats.hot_entries.saturating_sub(1);
        self.stats.cold_entries += 1;
    }

    /// Removes data, metadata, deltas and the index row. The bloom filter
    /// keeps the key.
    fn delete(&mut self, collection: &str, id: &str) {
        let k = key(collection, id);
        self.chunks.remove(&k);
        self.deltas.remove(&k);
        if let Some(index) = self.index.get_mut(collection) {
            index.retain(|e| e.id != id);
        }
        if let Some(meta) = self.meta.remove(&k) {
            self.stats_update(
                u64::from(meta.compressed_size),
                u64::from(meta.original_size),
                false,
                meta.zone == StorageZone::Hot,
            );
        }
    }
}

// =============================================================================
// Call decoding
// =============================================================================

/// A decoded contract invocation.
#[derive(Debug)]
enum Call {
    Put { collection: String, id: String, data: Vec<u8> },
    PutZone { collection: String, id: String, data: Vec<u8>, zone: StorageZone },
    BatchPut { entries: Vec<(String, String, Vec<u8>)> },
    DeltaUpdate { collection: String, id: String, patch: Vec<u8> },
    MigrateToCold { collection: String, id: String },
    Delete { collection: String, id: String },
    Get { collection: String, id: String },
    GetMeta { collection: String, id: String },
    GetDeltas { collection: String, id: String },
    BloomCheck { collection: String, id: String },
    Has { collection: String, id: String },
    GetIndex { collection: String },
    GetStats,
}

struct Args<'a>(&'a [ScVal]);

impl Args<'_> {
    fn at(&self, i: usize) -> std::result::Result<&ScVal, String> {
        self.0.get(i).ok_or_else(|| format!("missing argument {i}"))
    }

    fn string(&self, i: usize) -> std::result::Result<String, String> {
        String::from_scval(self.at(i)?).map_err(|e| e.to_string())
    }

    fn bytes(&self, i: usize) -> std::result::Result<Vec<u8>, String> {
        self.at(i)?.clone().into_bytes().map_err(|e| e.to_string())
    }

    fn list(&self, i: usize) -> std::result::Result<&[ScVal], String> {
        match self.at(i)? {
            ScVal::Vec(items) => Ok(items),
            other => Err(format!("argument {i}: expected vec, found {}", other.kind())),
        }
    }
}

impl Call {
    fn decode(method: &str, args: &[ScVal]) -> std::result::Result<Self, String> {
        let a = Args(args);
        let call = match method {
            "put" => Self::Put { collection: a.string(0)?, id: a.string(1)?, data: a.bytes(2)? },
            "put_zone" => Self::PutZone {
                collection: a.string(0)?,
                id: a.string(1)?,
                data: a.bytes(2)?,
                zone: StorageZone::from_scval(a.at(3)?).map_err(|e| e.to_string())?,
            },
            "batch_put" => {
                let (collections, ids, values) = (a.list(0)?, a.list(1)?, a.list(2)?);
                if collections.len() != ids.len() || collections.len() != values.len() {
                    return Err("Mismatched batch sizes".to_owned());
                }
                let mut entries = Vec::with_capacity(collections.len());
                for ((c, i), v) in collections.iter().zip(ids).zip(values) {
                    let c = String::from_scval(c).map_err(|e| e.to_string())?;
                    let i = String::from_scval(i).map_err(|e| e.to_string())?;
                    let v = v.clone().into_bytes().map_err(|e| e.to_string())?;
                    entries.push((c, i, v));
                }
                Self::BatchPut { entries }
            },
            "delta_update" => Self::DeltaUpdate {
                collection: a.string(0)?,
                id: a.string(1)?,
                patch: a.bytes(2)?,
            },
            "migrate_to_cold" => Self::MigrateToCold { collection: a.string(0)?, id: a.string(1)? },
            "delete" => Self::Delete { collection: a.string(0)?, id: a.string(1)? },
            "get" => Self::Get { collection: a.string(0)?, id: a.string(1)? },
            "get_meta" => Self::GetMeta { collection: a.string(0)?, id: a.string(1)? },
            "get_deltas" => Self::GetDeltas { collection: a.string(0)?, id: a.string(1)? },
            "bloom_check" => Self::BloomCheck { collection: a.string(0)?, id: a.string(1)? },
            "has" => Self::Has { collection: a.string(0)?, id: a.string(1)? },
            "get_index" => Self::GetIndex { collection: a.string(0)? },
            "get_stats" => Self::GetStats,
            other => return Err(format!("unknown contract method {other}")),
        };
        Ok(call)
    }

    /// Checks preconditions that make the contract trap.
    fn check(&self, state: &ContractState) -> std::result::Result<(), String> {
        match self {
            Self::DeltaUpdate { collection, id, .. }
                if !state.chunks.contains_key(&key(collection, id)) =>
            {
                Err("Entry not found for delta update".to_owned())
            },
            _ => Ok(()),
        }
    }

    fn apply(self, state: &mut ContractState, now: u64) -> std::result::Result<ScVal, String> {
        match self {
            Self::Put { collection, id, data } => {
                state.put(&collection, &id, data, StorageZone::Hot, now);
            },
            Self::PutZone { collection, id, data, zone } => {
                state.put(&collection, &id, data, zone, now);
            },
            Self::BatchPut { entries } => {
                for (collection, id, data) in entries {
                    state.put(&collection, &id, data, StorageZone::Hot, now);
                }
            },
            Self::DeltaUpdate { collection, id, patch } => {
                state.delta_update(&collection, &id, patch, now)?;
            },
            Self::MigrateToCold { collection, id } => state.migrate_to_cold(&collection, &id, now),
            Self::Delete { collection, id } => state.delete(&collection, &id),
            read => return Ok(read.read(state)),
        }
        Ok(ScVal::Void)
    }

    fn read(self, state: &ContractState) -> ScVal {
        match self {
            Self::Get { collection, id } => {
                ScVal::Bytes(state.chunks.get(&key(&collection, &id)).cloned().unwrap_or_default())
            },
            Self::GetMeta { collection, id } => state
                .meta
                .get(&key(&collection, &id))
                .cloned()
                .map_or(ScVal::Void, IntoScVal::into_scval),
            Self::GetDeltas { collection, id } => ScVal::Vec(
                state
                    .deltas
                    .get(&key(&collection, &id))
                    .map(|d| d.iter().cloned().map(ScVal::Bytes).collect())
                    .unwrap_or_default(),
            ),
            Self::BloomCheck { collection, id } => ScVal::Bool(state.bloom_check(&collection, &id)),
            Self::Has { collection, id } => {
                ScVal::Bool(state.chunks.contains_key(&key(&collection, &id)))
            },
            Self::GetIndex { collection } => ScVal::Vec(
                state
                    .index
                    .get(&collection)
                    .map(|entries| entries.iter().cloned().map(IntoScVal::into_scval).collect())
                    .unwrap_or_default(),
            ),
            Self::GetStats => state.stats.clone().into_scval(),
            _ => ScVal::Void,
        }
    }
}

// =============================================================================
// Mock ledger
// =============================================================================

/// Submitted transaction as tracked by the mock.
#[derive(Debug, Clone, Copy)]
struct TxRecord {
    status: TransactionStatus,
    not_found_polls: u32,
}

/// In-process ledger with a vault contract.
#[derive(Debug)]
pub struct MockLedger {
    network_passphrase: String,
    contract: RwLock<ContractState>,
    accounts: RwLock<HashMap<String, u64>>,
    transactions: RwLock<HashMap<String, TxRecord>>,

    bad_sequence_remaining: AtomicUsize,
    send_error: Mutex<Option<String>>,
    pending_polls: AtomicU32,
    never_confirm: AtomicBool,
    simulation_errors: AtomicUsize,

    send_count: AtomicUsize,
    simulate_count: AtomicUsize,
    account_fetch_count: AtomicUsize,
    ledger_time: AtomicU64,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Creates an empty ledger on the test network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_network_passphrase(TESTNET_PASSPHRASE)
    }

    /// Creates an empty ledger verifying signatures for `passphrase`.
    #[must_use]
    pub fn with_network_passphrase(passphrase: &str) -> Self {
        Self {
            network_passphrase: passphrase.to_owned(),
            contract: RwLock::new(ContractState::default()),
            accounts: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
            bad_sequence_remaining: AtomicUsize::new(0),
            send_error: Mutex::new(None),
            pending_polls: AtomicU32::new(0),
            never_confirm: AtomicBool::new(false),
            simulation_errors: AtomicUsize::new(0),
            send_count: AtomicUsize::new(0),
            simulate_count: AtomicUsize::new(0),
            account_fetch_count: AtomicUsize::new(0),
            ledger_time: AtomicU64::new(GENESIS_TIME),
        }
    }

    // -------------------------------------------------------------------------
    // Failure injection
    // -------------------------------------------------------------------------

    /// Rejects the next `count` sends with `txBadSeq`, advancing the account
    /// sequence each time as a competing writer would.
    pub fn inject_bad_sequence(&self, count: usize) {
        self.bad_sequence_remaining.store(count, Ordering::SeqCst);
    }

    /// Rejects the next send with `payload` as its error result.
    pub fn inject_send_error(&self, payload: &str) {
        *self.send_error.lock() = Some(payload.to_owned());
    }

    /// Makes each new transaction report `NOT_FOUND` for `polls` lookups.
    pub fn set_pending_polls(&self, polls: u32) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    /// Makes every transaction report `NOT_FOUND` forever.
    pub fn set_never_confirm(&self, never: bool) {
        self.never_confirm.store(never, Ordering::SeqCst);
    }

    /// Fails the next `count` simulations.
    pub fn inject_simulation_error(&self, count: usize) {
        self.simulation_errors.store(count, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Number of `sendTransaction` calls.
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Number of `simulateTransaction` calls.
    pub fn simulate_count(&self) -> usize {
        self.simulate_count.load(Ordering::SeqCst)
    }

    /// Number of `getAccount` calls.
    pub fn account_fetch_count(&self) -> usize {
        self.account_fetch_count.load(Ordering::SeqCst)
    }

    /// Current sequence of an account (zero if unknown).
    pub fn sequence_of(&self, address: &str) -> u64 {
        self.accounts.read().get(address).copied().unwrap_or(0)
    }

    /// Raw stored payload of an entry.
    pub fn raw_entry(&self, collection: &str, id: &str) -> Option<Vec<u8>> {
        self.contract.read().chunks.get(&key(collection, id)).cloned()
    }

    /// Overwrites a stored payload directly, bypassing the network.
    pub fn set_raw_entry(&self, collection: &str, id: &str, data: Vec<u8>) {
        let now = self.ledger_time.load(Ordering::SeqCst);
        self.contract.write().put(collection, id, data, StorageZone::Hot, now);
    }

    /// Clears contract storage, accounts, transactions and injections.
    pub fn reset(&self) {
        *self.contract.write() = ContractState::default();
        self.accounts.write().clear();
        self.transactions.write().clear();
        self.bad_sequence_remaining.store(0, Ordering::SeqCst);
        *self.send_error.lock() = None;
        self.pending_polls.store(0, Ordering::SeqCst);
        self.never_confirm.store(false, Ordering::SeqCst);
        self.simulation_errors.store(0, Ordering::SeqCst);
        self.send_count.store(0, Ordering::SeqCst);
        self.simulate_count.store(0, Ordering::SeqCst);
        self.account_fetch_count.store(0, Ordering::SeqCst);
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }

    fn rejected(hash: String, payload: &str) -> SendResponse {
        SendResponse {
            status: SendStatus::Error,
            hash,
            error_result: Some(serde_json::Value::String(payload.to_owned())),
        }
    }

    fn record(&self, hash: &str, status: TransactionStatus) {
        let record = TxRecord { status, not_found_polls: self.pending_polls.load(Ordering::SeqCst) };
        self.transactions.write().insert(hash.to_owned(), record);
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_account(&self, address: &str) -> Result<AccountState> {
        self.account_fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(AccountState { sequence: self.sequence_of(address) })
    }

    async fn prepare_transaction(&self, mut tx: Transaction) -> Result<Transaction> {
        let call = Call::decode(&tx.operation.method, &tx.operation.args)
            .map_err(|message| RpcSnafu { method: "prepareTransaction", message }.build())?;
        call.check(&self.contract.read()).map_err(|e| {
            RpcSnafu { method: "prepareTransaction", message: format!("HostError: {e}") }.build()
        })?;
        let args_len: usize = tx
            .operation
            .args
            .iter()
            .map(|a| a.as_bytes().map_or(16, <[u8]>::len))
            .sum();
        tx.resource_fee = Some(10_000 + args_len as u64);
        Ok(tx)
    }

    async fn send_transaction(&self, signed: &SignedTransaction) -> Result<SendResponse> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        let tx = &signed.transaction;
        let hash = tx.hash(&self.network_passphrase)?;

        if signer::verify_transaction(signed, &self.network_passphrase).is_err() {
            return Ok(Self::rejected(hash, "txBadAuth"));
        }

        if Self::take_one(&self.bad_sequence_remaining) {
            *self.accounts.write().entry(tx.source.clone()).or_insert(0) += 1;
            return Ok(Self::rejected(hash, "txBadSeq"));
        }
        if let Some(payload) = self.send_error.lock().take() {
            return Ok(Self::rejected(hash, &payload));
        }
        if self.transactions.read().contains_key(&hash) {
            return Ok(SendResponse { status: SendStatus::Duplicate, hash, error_result: None });
        }

        {
            let mut accounts = self.accounts.write();
            let current = accounts.entry(tx.source.clone()).or_insert(0);
            if tx.sequence != *current + 1 {
                return Ok(Self::rejected(hash, "txBadSeq"));
            }
            *current = tx.sequence;
        }

        let now = self.ledger_time.fetch_add(LEDGER_CLOSE_SECS, Ordering::SeqCst);
        let applied = Call::decode(&tx.operation.method, &tx.operation.args)
            .and_then(|call| call.apply(&mut self.contract.write(), now));
        let status = match applied {
            Ok(_) => TransactionStatus::Success,
            Err(_) => TransactionStatus::Failed,
        };
        self.record(&hash, status);

        Ok(SendResponse { status: SendStatus::Pending, hash, error_result: None })
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionStatus> {
        if self.never_confirm.load(Ordering::SeqCst) {
            return Ok(TransactionStatus::NotFound);
        }
        let mut transactions = self.transactions.write();
        let Some(record) = transactions.get_mut(hash) else {
            return Ok(TransactionStatus::NotFound);
        };
        if record.not_found_polls > 0 {
            record.not_found_polls -= 1;
            return Ok(TransactionStatus::NotFound);
        }
        Ok(record.status)
    }

    async fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulationResponse> {
        self.simulate_count.fetch_add(1, Ordering::SeqCst);
        if Self::take_one(&self.simulation_errors) {
            return Ok(SimulationResponse {
                result: None,
                error: Some("HostError: injected simulation failure".to_owned()),
            });
        }
        let call = match Call::decode(&tx.operation.method, &tx.operation.args) {
            Ok(call) => call,
            Err(e) => return Ok(SimulationResponse { result: None, error: Some(e) }),
        };
        let state = self.contract.read();
        let response = match call.check(&state) {
            Ok(()) => SimulationResponse { result: Some(call.read(&state)), error: None },
            Err(e) => SimulationResponse { result: None, error: Some(format!("HostError: {e}")) },
        };
        Ok(response)
    }
}
