//! Record types, codec and validation for the chain vault storage engine.
//!
//! This crate provides the pieces shared by every vault consumer:
//! - The record codec (JSON + Zstandard) used for every stored payload
//! - Mirrors of the on-chain contract's metadata, index and stats records
//! - Collection and index naming rules
//! - Write-path input validation

pub mod codec;
pub mod types;
pub mod validation;

pub use codec::{CodecError, CompressionEnvelope, Decompressed, compress, decompress, decompress_as};
pub use types::*;
pub use validation::{ValidationConfig, ValidationError};
