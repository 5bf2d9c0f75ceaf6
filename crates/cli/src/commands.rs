//! Command dispatch.
//!
//! Every command produces a JSON document; `main` prints it.

use chain_vault_sdk::{SubmitOutcome, SubmitStatus, Vault, VaultError};
use serde_json::{Value, json};
use snafu::{ResultExt, Snafu};

use crate::{config::Command, simulate};

/// Errors surfaced to the operator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    /// A record argument is not valid JSON.
    #[snafu(display("Invalid JSON for {what}: {source}"))]
    InvalidJson {
        /// Which argument failed to parse.
        what: &'static str,
        /// Parser error.
        source: serde_json::Error,
    },

    /// A vault operation failed.
    #[snafu(context(false), display("{source}"))]
    Vault {
        /// Underlying vault error.
        source: VaultError,
    },

    /// The simulation journey found an inconsistency.
    #[snafu(display("Simulation failed at {step}: {message}"))]
    Simulation {
        /// Journey step that failed.
        step: &'static str,
        /// What went wrong.
        message: String,
    },
}

fn parse_record(json: &str) -> Result<Value, CliError> {
    serde_json::from_str(json).context(InvalidJsonSnafu { what: "record" })
}

/// Renders a write outcome for the operator.
pub fn outcome_json(outcome: &SubmitOutcome) -> Value {
    let status = match outcome.status {
        SubmitStatus::Confirmed => "confirmed".to_owned(),
        SubmitStatus::Unconfirmed(last) => format!("unconfirmed ({last})"),
        SubmitStatus::Accepted(status) => format!("accepted ({status})"),
        SubmitStatus::Skipped => "skipped".to_owned(),
    };
    json!({ "hash": outcome.hash, "status": status })
}

/// Runs one command against `vault`.
///
/// # Errors
///
/// Returns `InvalidJson` for unparsable record arguments, `Vault` for failed
/// operations and `Simulation` when the journey finds an inconsistency.
pub async fn run(vault: &Vault, command: Command) -> Result<Value, CliError> {
    let value = match command {
        Command::Put { collection, id, json, zone } => {
            let record = parse_record(&json)?;
            let outcome = match zone {
                Some(zone) => vault.put_zone(&collection, &id, &record, zone.into()).await?,
                None => vault.put(&collection, &id, &record).await?,
            };
            outcome_json(&outcome)
        },
        Command::PutIndexed { collection, id, json, field, value } => {
            let record = parse_record(&json)?;
            outcome_json(&vault.put_with_index(&collection, &id, &record, &field, &value).await?)
        },
        Command::Delta { collection, id, json } => {
            let patch = parse_record(&json)?;
            outcome_json(&vault.delta_update(&collection, &id, &patch).await?)
        },
        Command::Get { collection, id } => vault.get(&collection, &id).await?.unwrap_or(Value::Null),
        Command::GetAll { collection } => Value::Array(vault.get_all(&collection).await?),
        Command::GetByIndex { collection, field, value } => {
            vault.get_by_index(&collection, &field, &value).await?.unwrap_or(Value::Null)
        },
        Command::Meta { collection, id } => json!(vault.get_meta(&collection, &id).await?),
        Command::Deltas { collection, id } => Value::Array(vault.get_deltas(&collection, &id).await?),
        Command::Has { collection, id } => Value::Bool(vault.has(&collection, &id).await?),
        Command::Bloom { collection, id } => Value::Bool(vault.bloom_check(&collection, &id).await?),
        Command::Index { collection } => json!(vault.get_index(&collection).await?),
        Command::Stats => json!(vault.get_stats().await?),
        Command::Migrate { collection, id } => outcome_json(&vault.migrate_to_cold(&collection, &id).await?),
        Command::Delete { collection, id } => outcome_json(&vault.delete(&collection, &id).await?),
        Command::Simulate => simulate::run(vault).await?,
    };
    Ok(value)
}
