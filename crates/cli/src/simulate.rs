//! Deployment check: a recruit joins, takes a mission, submits proofs and
//! the result is read back through every index.
//!
//! Ids carry a per-run tag so repeated runs against the same contract do
//! not collide.

use std::time::{SystemTime, UNIX_EPOCH};

use chain_vault_sdk::{Repository, Vault};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::commands::{CliError, SimulationSnafu, outcome_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Recruit {
    name: String,
    division: u32,
    reiatsu: u32,
    email: String,
    bio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Proof {
    kind: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Mission {
    title: String,
    location: String,
    assigned_to: String,
    reward: u64,
    status: String,
    #[serde(default)]
    proofs: Vec<Proof>,
}

fn run_tag() -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    format!("{:x}", nanos & 0xffff_ffff_ffff)
}

fn fail(step: &'static str, message: impl Into<String>) -> CliError {
    SimulationSnafu { step, message: message.into() }.build()
}

/// Runs the journey and returns a per-step report.
///
/// Without a configured contract every write is skipped and verification is
/// reported as skipped rather than failed.
///
/// # Errors
///
/// Returns `Vault` errors from any step and `Simulation` when a read-back
/// does not match what was written.
pub async fn run(vault: &Vault) -> Result<Value, CliError> {
    let tag = run_tag();
    let recruits: Repository<Recruit> = Repository::new(vault.clone(), "Users");
    let missions: Repository<Mission> = Repository::new(vault.clone(), "Missions");

    tracing::info!(tag = %tag, "[1/4] recruitment");
    let user_id = format!("CAPTAIN_{tag}");
    let recruit = Recruit {
        name: "Zaraki Kenpachi".to_owned(),
        division: 11,
        reiatsu: 9000,
        email: format!("zaraki_{tag}@gotei13.soul"),
        bio: format!("I love to fight. {}", "A".repeat(500)),
    };
    let recruited = recruits.save_indexed(&user_id, &recruit, "Email", &recruit.email).await?;

    tracing::info!(user_id = %user_id, "[2/4] mission assignment");
    let mission_id = format!("MISSION_{tag}");
    let mission = Mission {
        title: "Neutralize Hollow Threat".to_owned(),
        location: "Rukongai District 80".to_owned(),
        assigned_to: user_id.clone(),
        reward: 5000,
        status: "ACTIVE".to_owned(),
        proofs: Vec::new(),
    };
    let assigned = missions.save_indexed(&mission_id, &mission, "Assignee", &user_id).await?;

    tracing::info!(mission_id = %mission_id, "[3/4] proof submission");
    let mut current = missions.find(&mission_id).await?.unwrap_or(mission);
    current.proofs = vec![
        Proof { kind: "IMAGE_CID".to_owned(), value: "bafy...hollow_mask".to_owned() },
        Proof { kind: "LOG".to_owned(), value: "Target neutralized.".to_owned() },
    ];
    current.status = "COMPLETED".to_owned();
    let proven = missions.save(&mission_id, &current).await?;

    tracing::info!("[4/4] verification");
    let verification = if recruited.is_skipped() {
        tracing::warn!("vault not writable, verification skipped");
        json!("skipped")
    } else {
        let found = recruits.find_by("Email", &recruit.email).await?;
        if found.as_ref() != Some(&recruit) {
            return Err(fail("verification", format!("email index returned {found:?}")));
        }
        let by_assignee = missions.find_by("Assignee", &user_id).await?;
        match by_assignee {
            Some(m) if m.status == "COMPLETED" && m.proofs.len() == 2 => {},
            other => return Err(fail("verification", format!("assignee index returned {other:?}"))),
        }
        if !vault.collections().read("Missions").await?.contains(&mission_id) {
            return Err(fail("verification", "mission missing from collection index"));
        }
        json!({
            "email_index": "ok",
            "assignee_index": "ok",
            "collection_index": "ok",
            "stats": vault.get_stats().await?,
        })
    };

    Ok(json!({
        "user_id": user_id,
        "mission_id": mission_id,
        "recruitment": outcome_json(&recruited),
        "mission_assignment": outcome_json(&assigned),
        "proof_submission": outcome_json(&proven),
        "verification": verification,
    }))
}
