//! Sample records.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The post used by the end-to-end scenarios.
#[must_use]
pub fn sample_post(need_amount: u64) -> Value {
    json!({ "Title": "Flood Relief", "NeedAmount": need_amount })
}

/// A typed user record with an email suitable for a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SampleUser {
    /// Display name.
    pub name: String,
    /// Secondary index value.
    pub email: String,
    /// Division number.
    pub division: u32,
}

/// Returns a user numbered `n`.
#[must_use]
pub fn sample_user(n: u32) -> SampleUser {
    SampleUser { name: format!("User {n}"), email: format!("user{n}@example.org"), division: n % 13 }
}
