//! Proptest strategies for vault records and keys.
//!
//! # Usage
//!
//! ```no_run
//! use chain_vault_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(record in strategies::arb_record()) {
//!         // test invariant with a randomly generated record
//!     }
//! }
//! ```

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

/// Generates a collection name matching `[A-Z][A-Za-z0-9_]{0,15}`.
pub fn arb_collection() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,15}"
}

/// Generates an entry id: short alphanumeric keys plus a few email-like and
/// unicode ids, as secondary index values look.
pub fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z0-9]{1,24}",
        1 => "[a-z]{1,8}@[a-z]{1,8}\\.(com|org)",
        1 => "\\PC{1,12}",
    ]
}

/// Generates a JSON number: small and boundary integers plus floats that
/// survive a text round trip exactly (quarter steps).
pub fn arb_number() -> impl Strategy<Value = Number> {
    prop_oneof![
        (-1_000i64..1_000).prop_map(Number::from),
        prop::sample::select(vec![0i64, -1, i64::MIN, i64::MAX, 9_007_199_254_740_991]).prop_map(Number::from),
        any::<u64>().prop_map(Number::from),
        (-1_000_000i32..1_000_000)
            .prop_filter_map("finite", |n| Number::from_f64(f64::from(n) / 4.0)),
    ]
}

/// Generates a JSON leaf value.
pub fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        arb_number().prop_map(Value::Number),
        "\\PC{0,32}".prop_map(Value::String),
    ]
}

/// Generates an arbitrary JSON value up to four levels deep.
pub fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[A-Za-z_][A-Za-z0-9_]{0,11}", inner, 0..8)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generates a record shaped like application data: a JSON object at the top.
pub fn arb_record() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[A-Z][A-Za-z]{0,11}", arb_json(), 0..10)
        .prop_map(|fields| Value::Object(fields.into_iter().collect()))
}

/// Generates a batch of distinct ids with a record each.
pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z0-9]{1,12}", arb_record(), 0..max)
        .prop_map(|records| records.into_iter().collect())
}
