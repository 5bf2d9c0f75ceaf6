//! Fuzz target for the record codec.
//!
//! Arbitrary bytes fed to `decompress` must never panic. Any JSON document
//! must survive a compress/decompress round trip unchanged.

#![no_main]

use chain_vault_types::{ChunkMeta, compress, decompress, decompress_as};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 3;
    let payload = &data[1..];

    match selector {
        0 => {
            // Corrupt stored payloads must surface as errors.
            let _ = decompress(payload);
        },
        1 => {
            let _ = decompress_as::<ChunkMeta>(payload);
        },
        _ => roundtrip_json(payload),
    }
});

/// If the bytes parse as JSON, compressing and decompressing must return the
/// same value.
fn roundtrip_json(data: &[u8]) {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let envelope = compress(&value).expect("compress after successful parse");
    assert_eq!(envelope.compressed_size, envelope.buffer.len() as u64);

    let decoded = decompress(&envelope.buffer)
        .expect("decompress own output")
        .expect("non-empty payload");
    assert_eq!(decoded.value, value, "roundtrip mismatch");
    assert_eq!(decoded.decompressed_size, envelope.original_size);
}
