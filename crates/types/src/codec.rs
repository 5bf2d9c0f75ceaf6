//! Record codec: JSON serialization wrapped in a Zstandard frame.
//!
//! Every payload stored in the vault goes through this module. Records are
//! serialized to JSON text and compressed with zstd at a low level, which
//! keeps compress and decompress symmetric and fast for synchronous writes.
//!
//! An empty payload is treated as absence rather than an error: the on-chain
//! `get` returns empty bytes for a missing key, and callers must see a miss.
//! A payload that is present but fails to decompress or parse is corrupt and
//! surfaces as a distinguishable [`CodecError`].

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::{ResultExt, Snafu};

/// Compression level handed to zstd.
pub const ZSTD_LEVEL: i32 = 3;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CodecError {
    /// The record could not be serialized to JSON.
    #[snafu(display("Serialization failed: {source}"))]
    Serialize {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The serialized record could not be compressed.
    #[snafu(display("Compression failed: {source}"))]
    Compress {
        /// The underlying zstd I/O error.
        source: std::io::Error,
    },

    /// The payload is not a valid zstd frame.
    #[snafu(display("Decompression failed: {source}"))]
    Decompress {
        /// The underlying zstd I/O error.
        source: std::io::Error,
    },

    /// The decompressed payload is not valid JSON for the requested type.
    #[snafu(display("Deserialization failed: {source}"))]
    Deserialize {
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Returns true if the error was raised while reading a stored payload.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Decompress { .. } | Self::Deserialize { .. })
    }
}

/// A compressed record ready to be persisted.
///
/// Only `buffer` is written to the ledger. The sizes exist for logging and
/// metrics and are never consulted when reading a payload back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionEnvelope {
    /// Length of the serialized JSON before compression.
    pub original_size: u64,
    /// Length of `buffer`.
    pub compressed_size: u64,
    /// The zstd frame.
    pub buffer: Vec<u8>,
}

impl CompressionEnvelope {
    /// Ratio of original to compressed size (e.g. `3.2` for 3.2x).
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            return 0.0;
        }
        self.original_size as f64 / self.compressed_size as f64
    }

    /// Bytes saved by compression. Zero when compression grew the payload.
    #[must_use]
    pub fn saved_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }

    /// Percentage of the original size saved by compression.
    #[must_use]
    pub fn saved_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 * 100.0 / self.original_size as f64
    }
}

/// A decoded record together with the sizes observed while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decompressed<T> {
    /// The decoded record.
    pub value: T,
    /// Length of the stored payload.
    pub compressed_size: u64,
    /// Length of the JSON text after decompression.
    pub decompressed_size: u64,
}

/// Serializes and compresses a record.
///
/// # Errors
///
/// Returns `CodecError::Serialize` if the record cannot be represented as
/// JSON, or `CodecError::Compress` if zstd fails.
pub fn compress<T: Serialize + ?Sized>(record: &T) -> Result<CompressionEnvelope, CodecError> {
    let json = serde_json::to_vec(record).context(SerializeSnafu)?;
    let buffer = zstd::encode_all(json.as_slice(), ZSTD_LEVEL).context(CompressSnafu)?;
    Ok(CompressionEnvelope {
        original_size: json.len() as u64,
        compressed_size: buffer.len() as u64,
        buffer,
    })
}

/// Decompresses a stored payload into a generic JSON value.
///
/// Returns `Ok(None)` for an empty payload.
///
/// # Errors
///
/// Returns `CodecError::Decompress` for a corrupt frame and
/// `CodecError::Deserialize` if the decompressed bytes are not JSON.
pub fn decompress(payload: &[u8]) -> Result<Option<Decompressed<Value>>, CodecError> {
    decompress_as(payload)
}

/// Decompresses a stored payload into a concrete type.
///
/// Returns `Ok(None)` for an empty payload.
///
/// # Errors
///
/// Returns `CodecError::Decompress` for a corrupt frame and
/// `CodecError::Deserialize` if the JSON does not match `T`.
pub fn decompress_as<T: DeserializeOwned>(
    payload: &[u8],
) -> Result<Option<Decompressed<T>>, CodecError> {
    if payload.is_empty() {
        return Ok(None);
    }
    let json = zstd::decode_all(payload).context(DecompressSnafu)?;
    let value = serde_json::from_slice(&json).context(DeserializeSnafu)?;
    Ok(Some(Decompressed {
        value,
        compressed_size: payload.len() as u64,
        decompressed_size: json.len() as u64,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_roundtrip_flat_record() {
        let record = json!({ "Title": "Flood Relief", "NeedAmount": 5000 });
        let envelope = compress(&record).expect("compress");
        let decoded = decompress(&envelope.buffer).expect("decompress").expect("present");
        assert_eq!(decoded.value, record);
        assert_eq!(decoded.compressed_size, envelope.compressed_size);
        assert_eq!(decoded.decompressed_size, envelope.original_size);
    }

    #[test]
    fn test_roundtrip_nested_record() {
        let record = json!({
            "name": "Zaraki Kenpachi",
            "division": 11,
            "active": true,
            "tags": ["captain", "eleventh", null],
            "stats": { "reiatsu": 9000, "ratio": -0.25, "history": [[1, 2], []] },
            "bio": "I love to fight. 世界 🦀",
        });
        let envelope = compress(&record).expect("compress");
        let decoded = decompress(&envelope.buffer).expect("decompress").expect("present");
        assert_eq!(decoded.value, record);
    }

    #[test]
    fn test_roundtrip_numeric_edges() {
        let record = json!([0, -1, i64::MIN, i64::MAX, u64::MAX, 9_007_199_254_740_991_i64, 1.5]);
        let envelope = compress(&record).expect("compress");
        let decoded = decompress(&envelope.buffer).expect("decompress").expect("present");
        assert_eq!(decoded.value, record);
    }

    #[test]
    fn test_roundtrip_scalar_records() {
        for record in [json!(null), json!(true), json!("p1"), json!(42)] {
            let envelope = compress(&record).expect("compress");
            let decoded = decompress(&envelope.buffer).expect("decompress").expect("present");
            assert_eq!(decoded.value, record);
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Mission {
        title: String,
        reward: u64,
        assigned_to: Option<String>,
    }

    #[test]
    fn test_typed_roundtrip() {
        let mission = Mission {
            title: "Neutralize Hollow Threat".to_owned(),
            reward: 5000,
            assigned_to: Some("CAPTAIN_1".to_owned()),
        };
        let envelope = compress(&mission).expect("compress");
        let decoded: Mission =
            decompress_as(&envelope.buffer).expect("decompress").expect("present").value;
        assert_eq!(decoded, mission);
    }

    #[test]
    fn test_empty_payload_is_absent() {
        assert!(decompress(&[]).expect("empty is not an error").is_none());
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let err = decompress(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(matches!(err, CodecError::Decompress { .. }));
        assert!(err.is_corrupt());
        assert!(err.to_string().starts_with("Decompression failed:"));
    }

    #[test]
    fn test_valid_frame_with_invalid_json_is_error() {
        let frame = zstd::encode_all(&b"not json"[..], ZSTD_LEVEL).unwrap();
        let err = decompress(&frame).unwrap_err();
        assert!(matches!(err, CodecError::Deserialize { .. }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_type_mismatch_is_deserialize_error() {
        let envelope = compress(&json!({ "unexpected": true })).unwrap();
        let err = decompress_as::<Mission>(&envelope.buffer).unwrap_err();
        assert!(matches!(err, CodecError::Deserialize { .. }));
    }

    #[test]
    fn test_repetitive_record_compresses() {
        let record = json!({ "bio": "A".repeat(500) });
        let envelope = compress(&record).unwrap();
        assert!(envelope.compressed_size < envelope.original_size);
        assert!(envelope.ratio() > 1.0);
        assert_eq!(envelope.saved_bytes(), envelope.original_size - envelope.compressed_size);
        assert!(envelope.saved_percent() > 0.0);
    }

    #[test]
    fn test_envelope_helpers_handle_zero_sizes() {
        let envelope = CompressionEnvelope { original_size: 0, compressed_size: 0, buffer: vec![] };
        assert_eq!(envelope.ratio(), 0.0);
        assert_eq!(envelope.saved_bytes(), 0);
        assert_eq!(envelope.saved_percent(), 0.0);
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-zA-Z0-9_]{0,12}", inner, 0..8)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_compress_decompress_is_identity(record in json_value()) {
            let envelope = compress(&record).unwrap();
            let decoded = decompress(&envelope.buffer).unwrap().unwrap();
            prop_assert_eq!(decoded.value, record);
        }
    }
}
