//! Saving and restoring the whole state graph as one record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::model::{now_millis, Group, Note, NotesState};
use crate::storage::{StateStorage, StorageError};
use crate::store::{NotesStore, SubscriptionId};

pub const STORAGE_KEY: &str = "notes-storage";
pub const STATE_VERSION: u32 = 0;

#[derive(Debug, Serialize)]
struct PersistedRef<'a> {
    state: &'a NotesState,
    version: u32,
}

#[derive(Debug, Deserialize)]
struct PersistedEnvelope {
    state: NotesState,
    #[serde(default)]
    version: u32,
}

// A bare `{ groups, notes, activeNoteId }` object, without the envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BareRecord {
    groups: Vec<Group>,
    notes: Vec<Note>,
    #[serde(default)]
    active_note_id: Option<String>,
}

impl From<BareRecord> for NotesState {
    fn from(record: BareRecord) -> Self {
        Self {
            groups: record.groups,
            notes: record.notes,
            active_note_id: record.active_note_id,
        }
    }
}

/// Where the initial state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    Restored,
    Bootstrap,
    Corrupt,
}

pub fn encode_state(state: &NotesState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PersistedRef {
        state,
        version: STATE_VERSION,
    })
}

/// Decodes a record. An object with a `state` key is only ever read as an
/// envelope; anything else must be a bare state object with no extra keys.
pub fn decode_state(raw: &str) -> Result<NotesState, serde_json::Error> {
    let value: JsonValue = serde_json::from_str(raw)?;
    if value.get("state").is_none() {
        let record: BareRecord = serde_json::from_value(value)?;
        return Ok(record.into());
    }

    let envelope: PersistedEnvelope = serde_json::from_value(value)?;
    if envelope.version != STATE_VERSION {
        log::warn!(
            "[PERSIST] Loading state version {} as version {}",
            envelope.version,
            STATE_VERSION
        );
    }
    Ok(envelope.state)
}

/// Reads the record under `key`. Falls back to the bootstrap state when the
/// record is missing, unreadable or corrupt.
pub fn load_state(storage: &dyn StateStorage, key: &str) -> (NotesState, Hydration) {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            log::info!("[PERSIST] No record under '{}', starting from defaults", key);
            return (NotesState::bootstrap(now_millis()), Hydration::Bootstrap);
        }
        Err(e) => {
            log::warn!("[PERSIST] Failed to read '{}': {}", key, e);
            return (NotesState::bootstrap(now_millis()), Hydration::Corrupt);
        }
    };

    match decode_state(&raw) {
        Ok(mut state) => {
            let repairs = state.repair();
            if repairs > 0 {
                log::warn!("[PERSIST] Repaired {} dangling reference(s) in '{}'", repairs, key);
            }
            debug_assert!(state.is_consistent());
            log::info!(
                "[PERSIST] Restored {} group(s) and {} note(s) from '{}'",
                state.groups.len(),
                state.notes.len(),
                key
            );
            (state, Hydration::Restored)
        }
        Err(e) => {
            log::warn!("[PERSIST] Ignoring corrupt record '{}': {}", key, e);
            (NotesState::bootstrap(now_millis()), Hydration::Corrupt)
        }
    }
}

pub fn save_state(
    storage: &dyn StateStorage,
    key: &str,
    state: &NotesState,
) -> Result<(), StorageError> {
    let raw = encode_state(state)?;
    storage.set_item(key, &raw)
}

/// Persists every published snapshot. Failures are logged and dropped.
pub fn attach(store: &NotesStore, storage: Arc<dyn StateStorage>, key: &str) -> SubscriptionId {
    let key = key.to_string();
    store.subscribe(move |state| {
        if let Err(e) = save_state(storage.as_ref(), &key, state) {
            log::warn!("[PERSIST] Failed to save '{}': {}", key, e);
        }
    })
}

// ---- Tests ----
