//! An offline, block-based notes store.
//!
//! Notes live in collapsible groups and are made of text, image, video and
//! file blocks. [`NotesApp`] wires a [`NotesStore`] to durable storage: the
//! store is hydrated at start, every change is saved, and the final snapshot
//! is flushed at shutdown.

pub mod action;
pub mod gesture;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod persist;
pub mod settings;
pub mod storage;
pub mod store;
mod util;
pub mod view;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub use model::{Block, BlockKind, Group, NewBlock, Note, NotesState};
pub use persist::Hydration;
pub use settings::Settings;
pub use storage::{FileStorage, MemoryStorage, StateStorage, StorageError};
pub use store::{NotesStore, SubscriptionId};

// One running application: the store plus its persistence
pub struct NotesApp {
    store: Arc<NotesStore>,
    storage: Arc<dyn StateStorage>,
    settings: Settings,
    hydration: Hydration,
    persistence: SubscriptionId,
}

impl NotesApp {
    /// Starts from `data_dir`: loads settings, opens file storage and
    /// restores the last saved state.
    pub fn start(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir '{}'", data_dir.display()))?;

        let settings = settings::load_settings(data_dir);
        logging::init_logging(&settings.log_filter);

        let storage_dir = settings.storage_dir(data_dir);
        log::info!("[APP] Using storage at {}", storage_dir.display());
        let storage: Arc<dyn StateStorage> = Arc::new(FileStorage::new(storage_dir));

        Ok(Self::with_storage(settings, storage))
    }

    pub fn with_storage(settings: Settings, storage: Arc<dyn StateStorage>) -> Self {
        let (state, hydration) = persist::load_state(storage.as_ref(), &settings.storage_key);
        let store = Arc::new(NotesStore::new(state));
        let persistence = persist::attach(&store, Arc::clone(&storage), &settings.storage_key);

        Self {
            store,
            storage,
            settings,
            hydration,
            persistence,
        }
    }

    pub fn store(&self) -> &Arc<NotesStore> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hydration(&self) -> Hydration {
        self.hydration
    }

    /// Detaches persistence and writes the final snapshot once.
    pub fn shutdown(self) {
        self.store.unsubscribe(self.persistence);
        let state = self.store.snapshot();
        match persist::save_state(self.storage.as_ref(), &self.settings.storage_key, &state) {
            Ok(()) => log::info!("[APP] Saved {} note(s) on shutdown", state.notes.len()),
            Err(e) => log::warn!("[APP] Failed to save on shutdown: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_files, FileUpload};
    use crate::model::{DEFAULT_GROUP_ID, WELCOME_NOTE_ID};

    #[test]
    fn test_first_start_bootstraps_then_restores() {
        let dir = tempfile::tempdir().unwrap();

        let app = NotesApp::start(dir.path()).unwrap();
        assert_eq!(app.hydration(), Hydration::Bootstrap);
        let work = app.store().add_group("WORK");
        let todo = app.store().add_note(&work, "todo").unwrap();
        app.store().add_block(&todo, NewBlock::text("buy milk"));
        let before = app.store().snapshot();
        app.shutdown();

        assert!(dir.path().join("notes-storage.json").is_file());

        let app = NotesApp::start(dir.path()).unwrap();
        assert_eq!(app.hydration(), Hydration::Restored);
        let after = app.store().snapshot();
        assert_eq!(*after, *before);
        assert_eq!(after.active_note_id.as_deref(), Some(todo.as_str()));
    }

    #[test]
    fn test_changes_are_saved_without_shutdown() {
        let storage = Arc::new(MemoryStorage::new());
        let app = NotesApp::with_storage(Settings::default(), storage.clone());
        app.store().delete_group(DEFAULT_GROUP_ID);

        let reopened = NotesApp::with_storage(Settings::default(), storage.clone());
        let state = reopened.store().snapshot();
        assert!(state.groups.is_empty());
        assert!(state.notes.is_empty());
        assert_eq!(state.active_note_id, None);
    }

    #[test]
    fn test_custom_storage_key_and_dir() {
        let data = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let settings = Settings {
            storage_key: "journal".to_string(),
            storage_dir: Some(elsewhere.path().to_string_lossy().into_owned()),
            ..Settings::default()
        };
        settings::save_settings(data.path(), &settings).unwrap();

        let app = NotesApp::start(data.path()).unwrap();
        app.store().rename_note(WELCOME_NOTE_ID, "renamed");
        app.shutdown();

        assert!(elsewhere.path().join("journal.json").is_file());
        assert!(!data.path().join("notes-storage.json").exists());
    }

    #[test]
    fn test_shutdown_with_failing_storage_does_not_panic() {
        let storage = Arc::new(MemoryStorage::new());
        let app = NotesApp::with_storage(Settings::default(), storage.clone());
        storage.set_fail_writes(true);
        app.store().add_group("LOST");
        app.shutdown();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_ingested_files_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.jpg");
        std::fs::write(&photo, [0xFF, 0xD8, 0xFF]).unwrap();

        let storage = Arc::new(MemoryStorage::new());
        let app = NotesApp::with_storage(Settings::default(), storage.clone());
        for handle in ingest_files(
            Arc::clone(app.store()),
            WELCOME_NOTE_ID,
            vec![FileUpload::new(&photo)],
        ) {
            handle.await.unwrap();
        }
        app.shutdown();

        let reopened = NotesApp::with_storage(Settings::default(), storage);
        let state = reopened.store().snapshot();
        let note = state.note(WELCOME_NOTE_ID).unwrap();
        assert_eq!(note.blocks.len(), 2);
        assert_eq!(note.blocks[1].kind, BlockKind::Image);
        assert_eq!(note.blocks[1].mime_type.as_deref(), Some("image/jpeg"));
    }
}
