//! Contract value model.
//!
//! [`ScVal`] mirrors the ledger's typed value union used for contract call
//! arguments and results. It is carried over the JSON transport as an
//! adjacently tagged enum; 128-bit integers travel as decimal strings.
//!
//! Contract enums follow the ledger convention of a one-element vector
//! holding the variant symbol (`Vec[Symbol("Hot")]`); a bare symbol is also
//! accepted. Contract structs are maps keyed by field symbol.

use chain_vault_types::{ChunkMeta, CompressionAlgo, IndexEntry, StorageStats, StorageZone};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScValDecodeSnafu};

/// A typed contract value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScVal {
    /// Unit.
    Void,
    /// Boolean.
    Bool(bool),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 128-bit integer.
    U128(#[serde(with = "wide")] u128),
    /// Signed 128-bit integer.
    I128(#[serde(with = "wide")] i128),
    /// Short identifier.
    Symbol(String),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes.
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    /// Ordered vector.
    Vec(Vec<ScVal>),
    /// Ordered key/value map.
    Map(Vec<(ScVal, ScVal)>),
}

impl ScVal {
    /// Returns the variant name, used in decode errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "bool",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::U128(_) => "u128",
            Self::I128(_) => "i128",
            Self::Symbol(_) => "symbol",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Vec(_) => "vec",
            Self::Map(_) => "map",
        }
    }

    /// Creates a symbol value.
    #[must_use]
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.to_owned())
    }

    /// Encodes a unit enum variant the way contracts do.
    #[must_use]
    pub fn enum_variant(name: &str) -> Self {
        Self::Vec(vec![Self::symbol(name)])
    }

    /// Builds a struct value from `(field, value)` pairs.
    #[must_use]
    pub fn record<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ScVal)>,
    {
        Self::Map(fields.into_iter().map(|(k, v)| (Self::symbol(k), v)).collect())
    }

    /// Returns the payload of a `Bytes` value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Consumes a `Bytes` value.
    ///
    /// # Errors
    ///
    /// Returns `ScValDecode` for any other variant.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            other => mismatch("bytes", &other),
        }
    }

    /// Looks up a struct field by symbol.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ScVal> {
        match self {
            Self::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Self::Symbol(key) if key == name => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Returns the variant name of an encoded contract enum.
    fn variant_name(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name),
            Self::Vec(items) => match items.first() {
                Some(Self::Symbol(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

fn mismatch<T>(expected: &str, found: &ScVal) -> Result<T> {
    ScValDecodeSnafu { expected, found: found.kind() }.fail()
}

// =============================================================================
// Decoding
// =============================================================================

/// Types that can be decoded from a contract result.
pub trait FromScVal: Sized {
    /// Decodes `val`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::ScValDecode` if `val` has the wrong shape.
    fn from_scval(val: &ScVal) -> Result<Self>;
}

impl FromScVal for ScVal {
    fn from_scval(val: &ScVal) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromScVal for bool {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::Bool(b) => Ok(*b),
            other => mismatch("bool", other),
        }
    }
}

impl FromScVal for u32 {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::U32(n) => Ok(*n),
            other => mismatch("u32", other),
        }
    }
}

impl FromScVal for u64 {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::U64(n) => Ok(*n),
            ScVal::U32(n) => Ok(u64::from(*n)),
            other => mismatch("u64", other),
        }
    }
}

impl FromScVal for String {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::String(s) | ScVal::Symbol(s) => Ok(s.clone()),
            other => mismatch("string", other),
        }
    }
}

impl<T: FromScVal> FromScVal for Vec<T> {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::Vec(items) => items.iter().map(T::from_scval).collect(),
            other => mismatch("vec", other),
        }
    }
}

impl<T: FromScVal> FromScVal for Option<T> {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val {
            ScVal::Void => Ok(None),
            other => T::from_scval(other).map(Some),
        }
    }
}

impl FromScVal for StorageZone {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val.variant_name().and_then(StorageZone::from_name) {
            Some(zone) => Ok(zone),
            None => mismatch("StorageZone", val),
        }
    }
}

impl FromScVal for CompressionAlgo {
    fn from_scval(val: &ScVal) -> Result<Self> {
        match val.variant_name().and_then(CompressionAlgo::from_name) {
            Some(algo) => Ok(algo),
            None => mismatch("CompressionAlgo", val),
        }
    }
}

/// Reads named fields out of a struct-shaped value.
struct Fields<'a> {
    ty: &'static str,
    val: &'a ScVal,
}

impl<'a> Fields<'a> {
    fn of(ty: &'static str, val: &'a ScVal) -> Result<Self> {
        match val {
            ScVal::Map(_) => Ok(Self { ty, val }),
            other => mismatch(ty, other),
        }
    }

    fn get<T: FromScVal>(&self, name: &str) -> Result<T> {
        match self.val.field(name) {
            Some(v) => T::from_scval(v),
            None => ScValDecodeSnafu {
                expected: format!("{}.{name}", self.ty),
                found: "missing field",
            }
            .fail(),
        }
    }
}

impl FromScVal for ChunkMeta {
    fn from_scval(val: &ScVal) -> Result<Self> {
        let f = Fields::of("ChunkMeta", val)?;
        Ok(Self {
            compression: f.get("compression")?,
            original_size: f.get("original_size")?,
            compressed_size: f.get("compressed_size")?,
            checksum: f.get("checksum")?,
            zone: f.get("zone")?,
            version: f.get("version")?,
            created_at: f.get("created_at")?,
            updated_at: f.get("updated_at")?,
        })
    }
}

impl FromScVal for IndexEntry {
    fn from_scval(val: &ScVal) -> Result<Self> {
        let f = Fields::of("IndexEntry", val)?;
        Ok(Self {
            id: f.get("id")?,
            zone: f.get("zone")?,
            compressed_size: f.get("compressed_size")?,
            version: f.get("version")?,
        })
    }
}

impl FromScVal for StorageStats {
    fn from_scval(val: &ScVal) -> Result<Self> {
        let f = Fields::of("StorageStats", val)?;
        Ok(Self {
            total_entries: f.get("total_entries")?,
            hot_entries: f.get("hot_entries")?,
            cold_entries: f.get("cold_entries")?,
            total_bytes_stored: f.get("total_bytes_stored")?,
            total_bytes_original: f.get("total_bytes_original")?,
            compression_ratio: f.get("compression_ratio")?,
            bloom_false_positive_rate: f.get("bloom_false_positive_rate")?,
        })
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Types that can be passed as contract call arguments.
pub trait IntoScVal {
    /// Encodes `self`.
    fn into_scval(self) -> ScVal;
}

impl IntoScVal for ScVal {
    fn into_scval(self) -> ScVal {
        self
    }
}

impl IntoScVal for bool {
    fn into_scval(self) -> ScVal {
        ScVal::Bool(self)
    }
}

impl IntoScVal for u32 {
    fn into_scval(self) -> ScVal {
        ScVal::U32(self)
    }
}

impl IntoScVal for u64 {
    fn into_scval(self) -> ScVal {
        ScVal::U64(self)
    }
}

impl IntoScVal for &str {
    fn into_scval(self) -> ScVal {
        ScVal::String(self.to_owned())
    }
}

impl IntoScVal for String {
    fn into_scval(self) -> ScVal {
        ScVal::String(self)
    }
}

impl IntoScVal for Vec<u8> {
    fn into_scval(self) -> ScVal {
        ScVal::Bytes(self)
    }
}

impl IntoScVal for &[u8] {
    fn into_scval(self) -> ScVal {
        ScVal::Bytes(self.to_vec())
    }
}

impl IntoScVal for StorageZone {
    fn into_scval(self) -> ScVal {
        ScVal::enum_variant(self.as_str())
    }
}

impl IntoScVal for CompressionAlgo {
    fn into_scval(self) -> ScVal {
        ScVal::enum_variant(self.as_str())
    }
}

impl IntoScVal for ChunkMeta {
    fn into_scval(self) -> ScVal {
        ScVal::record([
            ("compression", self.compression.into_scval()),
            ("original_size", ScVal::U32(self.original_size)),
            ("compressed_size", ScVal::U32(self.compressed_size)),
            ("checksum", ScVal::U64(self.checksum)),
            ("zone", self.zone.into_scval()),
            ("version", ScVal::U32(self.version)),
            ("created_at", ScVal::U64(self.created_at)),
            ("updated_at", ScVal::U64(self.updated_at)),
        ])
    }
}

impl IntoScVal for IndexEntry {
    fn into_scval(self) -> ScVal {
        ScVal::record([
            ("id", ScVal::String(self.id)),
            ("zone", self.zone.into_scval()),
            ("compressed_size", ScVal::U32(self.compressed_size)),
            ("version", ScVal::U32(self.version)),
        ])
    }
}

impl IntoScVal for StorageStats {
    fn into_scval(self) -> ScVal {
        ScVal::record([
            ("total_entries", ScVal::U32(self.total_entries)),
            ("hot_entries", ScVal::U32(self.hot_entries)),
            ("cold_entries", ScVal::U32(self.cold_entries)),
            ("total_bytes_stored", ScVal::U64(self.total_bytes_stored)),
            ("total_bytes_original", ScVal::U64(self.total_bytes_original)),
            ("compression_ratio", ScVal::U32(self.compression_ratio)),
            ("bloom_false_positive_rate", ScVal::U32(self.bloom_false_positive_rate)),
        ])
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

mod wide {
    use std::{fmt::Display, str::FromStr};

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::VaultError;

    fn sample_meta() -> ChunkMeta {
        ChunkMeta {
            compression: CompressionAlgo::Zstd,
            original_size: 400,
            compressed_size: 100,
            checksum: 0xcbf2_9ce4_8422_2325,
            zone: StorageZone::Cold,
            version: 2,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_600,
        }
    }

    #[test]
    fn test_enum_decodes_from_vec_and_bare_symbol() {
        assert_eq!(
            StorageZone::from_scval(&ScVal::enum_variant("Cold")).unwrap(),
            StorageZone::Cold
        );
        assert_eq!(StorageZone::from_scval(&ScVal::symbol("Hot")).unwrap(), StorageZone::Hot);
        assert_eq!(
            CompressionAlgo::from_scval(&ScVal::enum_variant("Compact")).unwrap(),
            CompressionAlgo::Compact
        );
    }

    #[test]
    fn test_unknown_enum_variant_is_error() {
        let err = StorageZone::from_scval(&ScVal::enum_variant("Lukewarm")).unwrap_err();
        assert!(matches!(err, VaultError::ScValDecode { .. }));
    }

    #[test]
    fn test_chunk_meta_struct_roundtrip() {
        let encoded = sample_meta().into_scval();
        assert_eq!(ChunkMeta::from_scval(&encoded).unwrap(), sample_meta());
    }

    #[test]
    fn test_struct_missing_field_names_it() {
        let partial = ScVal::record([("id", ScVal::String("p1".to_owned()))]);
        let err = IndexEntry::from_scval(&partial).unwrap_err();
        assert_eq!(err.to_string(), "Expected IndexEntry.zone, found missing field");
    }

    #[test]
    fn test_struct_from_wrong_kind() {
        let err = StorageStats::from_scval(&ScVal::Bool(true)).unwrap_err();
        assert_eq!(err.to_string(), "Expected StorageStats, found bool");
    }

    #[test]
    fn test_vec_of_index_entries() {
        let entries = vec![
            IndexEntry { id: "a".to_owned(), zone: StorageZone::Hot, compressed_size: 10, version: 1 },
            IndexEntry { id: "b".to_owned(), zone: StorageZone::Cold, compressed_size: 12, version: 3 },
        ];
        let encoded = ScVal::Vec(entries.iter().cloned().map(IntoScVal::into_scval).collect());
        let decoded = Vec::<IndexEntry>::from_scval(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_bytes_encode_as_bytes() {
        let val = vec![1u8, 2, 3].into_scval();
        assert_eq!(val.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(val.into_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_option_treats_void_as_none() {
        assert_eq!(Option::<u32>::from_scval(&ScVal::Void).unwrap(), None);
        assert_eq!(Option::<u32>::from_scval(&ScVal::U32(7)).unwrap(), Some(7));
    }

    #[test]
    fn test_u64_widens_u32() {
        assert_eq!(u64::from_scval(&ScVal::U32(5)).unwrap(), 5);
        assert!(u32::from_scval(&ScVal::U64(5)).is_err());
    }

    #[test]
    fn test_json_wire_shape() {
        let val = ScVal::Vec(vec![
            ScVal::String("Posts".to_owned()),
            ScVal::Bytes(vec![0xde, 0xad]),
            ScVal::U128(u128::MAX),
            ScVal::Void,
        ]);
        let json = serde_json::to_value(&val).unwrap();
        assert_eq!(json["type"], "vec");
        assert_eq!(json["value"][1]["value"], "dead");
        assert_eq!(json["value"][2]["value"], u128::MAX.to_string());
        assert_eq!(json["value"][3]["type"], "void");
        let back: ScVal = serde_json::from_value(json).unwrap();
        assert_eq!(back, val);
    }
}
