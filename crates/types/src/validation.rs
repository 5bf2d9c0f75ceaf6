//! Input validation for vault write paths.
//!
//! Reads are never validated: a lookup with an odd key is simply a miss.
//! Writes are checked before anything is compressed or submitted so that a
//! malformed request never costs a ledger fee.
//!
//! ## Character Whitelists
//!
//! - Collection and field names: `[A-Za-z0-9_-]`. They are spliced into
//!   derived collection names (`Index_<collection>`,
//!   `<collection>_<field>_Index`), so separators must stay unambiguous.
//! - Entry ids: any non-empty UTF-8 string. Secondary index values such as
//!   email addresses are stored as ids of the index collection.

use std::fmt;

/// Default maximum byte length of collection names, field names and ids.
pub const DEFAULT_MAX_NAME_BYTES: usize = 256;

/// Default maximum compressed payload size (the contract's per-entry budget).
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 64 * 1024;

/// Limits applied by the validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Maximum byte length of names and ids.
    pub max_name_bytes: usize,
    /// Maximum compressed payload size.
    pub max_entry_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_name_bytes: DEFAULT_MAX_NAME_BYTES, max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES }
    }
}

/// Validation error with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

fn violation(field: &str, constraint: impl Into<String>) -> ValidationError {
    ValidationError { field: field.to_owned(), constraint: constraint.into() }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn validate_name(field: &str, name: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    if name.len() > config.max_name_bytes {
        return Err(violation(
            field,
            format!(
                "length {} bytes exceeds maximum {} bytes",
                name.len(),
                config.max_name_bytes
            ),
        ));
    }
    if let Some(pos) = name.find(|c: char| !is_name_char(c)) {
        return Err(violation(
            field,
            format!(
                "contains invalid character {:?} at byte offset {}; allowed: [A-Za-z0-9_-]",
                name[pos..].chars().next().unwrap_or('\0'),
                pos
            ),
        ));
    }
    Ok(())
}

/// Validates a collection name.
///
/// # Errors
///
/// Returns [`ValidationError`] if the name is empty, too long, or contains
/// characters outside `[A-Za-z0-9_-]`.
pub fn validate_collection(name: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    validate_name("collection", name, config)
}

/// Validates a secondary index field name.
///
/// # Errors
///
/// Returns [`ValidationError`] under the same rules as collection names.
pub fn validate_field(name: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    validate_name("field", name, config)
}

/// Validates an entry id.
///
/// # Errors
///
/// Returns [`ValidationError`] if the id is empty or exceeds `max_name_bytes`.
pub fn validate_id(id: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(violation("id", "must not be empty"));
    }
    if id.len() > config.max_name_bytes {
        return Err(violation(
            "id",
            format!("length {} bytes exceeds maximum {} bytes", id.len(), config.max_name_bytes),
        ));
    }
    Ok(())
}

/// Validates the size of a compressed payload.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload exceeds `max_entry_bytes`.
pub fn validate_payload(payload: &[u8], config: &ValidationConfig) -> Result<(), ValidationError> {
    if payload.len() > config.max_entry_bytes {
        return Err(violation(
            "payload",
            format!(
                "compressed length {} bytes exceeds maximum {} bytes",
                payload.len(),
                config.max_entry_bytes
            ),
        ));
    }
    Ok(())
}
