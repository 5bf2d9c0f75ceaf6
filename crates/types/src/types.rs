//! Record types mirrored from the on-chain vault contract.
//!
//! The contract owns these structures; the client only decodes them from
//! simulation results. Field names and widths follow the contract so that
//! decoding is a straight mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Collection naming
// ============================================================================

/// Collection holding the per-collection membership indexes.
pub const SYSTEM_COLLECTION: &str = "System";

/// Prefix of the entry id under which a collection's member list is stored.
pub const COLLECTION_INDEX_PREFIX: &str = "Index_";

/// Suffix of the derived collection holding a secondary index.
pub const SECONDARY_INDEX_SUFFIX: &str = "_Index";

/// Returns the id of the `System` entry listing the members of `collection`.
///
/// ```
/// assert_eq!(chain_vault_types::collection_index_key("Posts"), "Index_Posts");
/// ```
#[must_use]
pub fn collection_index_key(collection: &str) -> String {
    format!("{COLLECTION_INDEX_PREFIX}{collection}")
}

/// Returns the collection holding the `field` secondary index of `collection`.
///
/// ```
/// assert_eq!(
///     chain_vault_types::secondary_index_collection("Users", "Email"),
///     "Users_Email_Index"
/// );
/// ```
#[must_use]
pub fn secondary_index_collection(collection: &str, field: &str) -> String {
    format!("{collection}_{field}{SECONDARY_INDEX_SUFFIX}")
}

// ============================================================================
// Contract enums
// ============================================================================

/// Storage tier of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageZone {
    /// Frequently accessed entries.
    #[default]
    Hot,
    /// Archival entries.
    Cold,
}

impl StorageZone {
    /// Returns the contract's variant name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Cold => "Cold",
        }
    }

    /// Parses the contract's variant name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Hot" => Some(Self::Hot),
            "Cold" => Some(Self::Cold),
            _ => None,
        }
    }
}

impl fmt::Display for StorageZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression tag recorded in chunk metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionAlgo {
    /// Stored as-is.
    None,
    /// Zstandard frame produced by the client codec.
    #[default]
    Zstd,
    /// Key-shortened, whitespace-stripped JSON.
    Compact,
}

impl CompressionAlgo {
    /// Returns the contract's variant name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Zstd => "Zstd",
            Self::Compact => "Compact",
        }
    }

    /// Parses the contract's variant name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(Self::None),
            "Zstd" => Some(Self::Zstd),
            "Compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

// ============================================================================
// Contract structs
// ============================================================================

/// Per-entry metadata kept next to the compressed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Compression applied by the writer.
    pub compression: CompressionAlgo,
    /// Original size as estimated by the contract.
    pub original_size: u32,
    /// Stored payload length.
    pub compressed_size: u32,
    /// FNV-1a checksum of the stored payload.
    pub checksum: u64,
    /// Current storage tier.
    pub zone: StorageZone,
    /// Incremented by every delta update.
    pub version: u32,
    /// Ledger timestamp of the first write.
    pub created_at: u64,
    /// Ledger timestamp of the last write or migration.
    pub updated_at: u64,
}

/// Contract-side index row for one entry of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Entry id.
    pub id: String,
    /// Current storage tier.
    pub zone: StorageZone,
    /// Stored payload length.
    pub compressed_size: u32,
    /// Entry version.
    pub version: u32,
}

/// Global storage statistics maintained by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Number of live entries.
    pub total_entries: u32,
    /// Entries in the hot tier.
    pub hot_entries: u32,
    /// Entries in the cold tier.
    pub cold_entries: u32,
    /// Sum of stored payload lengths.
    pub total_bytes_stored: u64,
    /// Sum of estimated original sizes.
    pub total_bytes_original: u64,
    /// Percentage saved by compression (75 = 75% smaller).
    pub compression_ratio: u32,
    /// Expected bloom filter false positive rate, per mille.
    pub bloom_false_positive_rate: u32,
}

/// Per-mille false positive rate reported by an empty vault.
pub const DEFAULT_BLOOM_FALSE_POSITIVE_RATE: u32 = 8;

impl StorageStats {
    /// Statistics of an empty vault, also returned when no contract is reachable.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            total_entries: 0,
            hot_entries: 0,
            cold_entries: 0,
            total_bytes_stored: 0,
            total_bytes_original: 0,
            compression_ratio: 0,
            bloom_false_positive_rate: DEFAULT_BLOOM_FALSE_POSITIVE_RATE,
        }
    }
}

impl Default for StorageStats {
    fn default() -> Self {
        Self::empty()
    }
}
