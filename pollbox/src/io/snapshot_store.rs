//! Snapshot load/save helpers with schema + invariant validation.

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::invariants::validate_invariants;
use crate::core::reconcile::reconcile_votes;
use crate::io::storage::{Slot, SlotStorage};
use crate::model::Snapshot;
use crate::seed::{seed_feedback, seed_polls, seed_users};

const POLLS_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/snapshot/polls.schema.json"
));
const USERS_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/snapshot/users.schema.json"
));
const CURRENT_USER_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/snapshot/current_user.schema.json"
));
const FEEDBACK_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/snapshot/feedback.schema.json"
));

/// JSON Schema (Draft 2020-12) describing a slot's payload.
pub fn slot_schema(slot: Slot) -> &'static str {
    match slot {
        Slot::Polls => POLLS_SCHEMA,
        Slot::Users => USERS_SCHEMA,
        Slot::CurrentUser => CURRENT_USER_SCHEMA,
        Slot::Feedback => FEEDBACK_SCHEMA,
    }
}

/// Load every slot, seeding the ones never written, and validate the result.
///
/// Slots may disagree after a failed or interrupted write, or when one of them
/// falls back to seed data. A session naming an unknown user is dropped and
/// vote records are reconciled against the poll voter sets, each with a
/// warning. Whatever invariant violation remains (duplicate ids, polls with
/// fewer than two options, empty feedback) fails the load.
pub fn load_snapshot(storage: &dyn SlotStorage) -> Result<Snapshot> {
    let polls = load_slot(storage, Slot::Polls)?.unwrap_or_else(seed_polls);
    let users = load_slot(storage, Slot::Users)?.unwrap_or_else(seed_users);
    let session = load_slot::<Option<String>>(storage, Slot::CurrentUser)?.flatten();
    let feedback = load_slot(storage, Slot::Feedback)?.unwrap_or_else(seed_feedback);

    let mut snapshot = Snapshot {
        polls,
        users,
        session,
        feedback,
    };
    if let Some(id) = snapshot.session.as_deref()
        && snapshot.user(id).is_none()
    {
        warn!(user_id = id, "stored session names an unknown user, signing out");
        snapshot.session = None;
    }
    for repair in reconcile_votes(&mut snapshot) {
        warn!(repair = %repair, "repaired vote records on load");
    }

    let errors = validate_invariants(&snapshot);
    if !errors.is_empty() {
        return Err(anyhow!("snapshot invariants failed: {}", errors.join("; ")));
    }
    debug!(
        polls = snapshot.polls.len(),
        users = snapshot.users.len(),
        feedback = snapshot.feedback.len(),
        signed_in = snapshot.session.is_some(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Serialize one slot of `snapshot` as pretty JSON with a trailing newline.
pub fn encode_slot(snapshot: &Snapshot, slot: Slot) -> Result<String> {
    let payload = match slot {
        Slot::Polls => to_payload(&snapshot.polls),
        Slot::Users => to_payload(&snapshot.users),
        Slot::CurrentUser => to_payload(&snapshot.session),
        Slot::Feedback => to_payload(&snapshot.feedback),
    };
    payload.with_context(|| format!("serialize slot {}", slot.key()))
}

/// Overwrite one slot in full.
pub fn write_slot(storage: &mut dyn SlotStorage, snapshot: &Snapshot, slot: Slot) -> Result<()> {
    let payload = encode_slot(snapshot, slot)?;
    storage
        .write(slot, &payload)
        .with_context(|| format!("write slot {}", slot.key()))
}

/// Overwrite all four slots.
pub fn write_snapshot(storage: &mut dyn SlotStorage, snapshot: &Snapshot) -> Result<()> {
    for slot in Slot::ALL {
        write_slot(storage, snapshot, slot)?;
    }
    Ok(())
}

fn to_payload<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    Ok(buf)
}

fn load_slot<T: DeserializeOwned>(storage: &dyn SlotStorage, slot: Slot) -> Result<Option<T>> {
    let Some(raw) = storage.read(slot)? else {
        debug!(slot = slot.key(), "slot absent, using seed");
        return Ok(None);
    };
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parse slot {}", slot.key()))?;
    validate_schema(slot, &value)?;
    let parsed = serde_json::from_value(value)
        .with_context(|| format!("deserialize slot {}", slot.key()))?;
    Ok(Some(parsed))
}

fn validate_schema(slot: Slot, payload: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(slot_schema(slot))
        .with_context(|| format!("parse schema for slot {}", slot.key()))?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(payload) {
        let messages = compiled
            .iter_errors(payload)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "slot {} schema validation failed: {}",
            slot.key(),
            messages.join("; ")
        ));
    }
    Ok(())
}
