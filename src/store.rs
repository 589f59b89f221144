//! NotesStore — the single owner of the group/note/block graph.
//!
//! Readers take a cheap `Arc` of the current snapshot. Writers go through
//! [`NotesStore::dispatch`], which reduces the snapshot, publishes the result
//! and notifies listeners before returning. Commits are serialized, so
//! listeners observe snapshots in the order they were published.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::action::{reduce, Action};
use crate::model::{new_id, now_millis, NewBlock, NotesState};

pub type Listener = Arc<dyn Fn(&Arc<NotesState>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

thread_local! {
    // Set while this thread is running listeners under the commit lock.
    static NOTIFYING: Cell<bool> = const { Cell::new(false) };
}

struct NotifyingGuard;

impl NotifyingGuard {
    fn enter() -> Self {
        NOTIFYING.with(|n| n.set(true));
        NotifyingGuard
    }
}

impl Drop for NotifyingGuard {
    fn drop(&mut self) {
        NOTIFYING.with(|n| n.set(false));
    }
}

pub struct NotesStore {
    snapshot: RwLock<Arc<NotesState>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    commit: Mutex<()>,
    next_subscription: AtomicU64,
}

impl NotesStore {
    pub fn new(initial: NotesState) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(initial)),
            listeners: Mutex::new(Vec::new()),
            commit: Mutex::new(()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// The current snapshot. Holding it never blocks writers.
    pub fn snapshot(&self) -> Arc<NotesState> {
        Arc::clone(&self.snapshot.read().expect("snapshot read lock"))
    }

    /// Registers a listener called after every published change.
    ///
    /// Listeners run on the dispatching thread while the commit lock is held,
    /// so a listener that mutates the store would deadlock. Debug builds panic
    /// instead.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<NotesState>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("listeners lock")
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().expect("listeners lock");
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Applies an action. Returns whether a new snapshot was published.
    pub fn dispatch(&self, action: Action) -> bool {
        debug_assert!(
            !NOTIFYING.with(Cell::get),
            "listeners must not mutate the store"
        );
        let _commit = self.commit.lock().expect("commit lock");
        let name = action.name();

        let current = self.snapshot();
        let Some(next) = reduce(&current, action) else {
            log::debug!("[STORE] {} skipped: target not found", name);
            return false;
        };

        debug_assert!(next.is_consistent(), "{} broke a store invariant", name);
        let next = Arc::new(next);
        *self.snapshot.write().expect("snapshot write lock") = Arc::clone(&next);

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .expect("listeners lock")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let _notifying = NotifyingGuard::enter();
        for listener in listeners {
            listener(&next);
        }

        true
    }

    // ---- Groups ----

    /// Returns the id of the new group.
    pub fn add_group(&self, name: impl Into<String>) -> String {
        let id = new_id();
        self.dispatch(Action::AddGroup {
            id: id.clone(),
            name: name.into(),
            at: now_millis(),
        });
        id
    }

    pub fn rename_group(&self, id: &str, name: impl Into<String>) {
        self.dispatch(Action::RenameGroup {
            id: id.to_string(),
            name: name.into(),
        });
    }

    pub fn delete_group(&self, id: &str) {
        self.dispatch(Action::DeleteGroup { id: id.to_string() });
    }

    pub fn toggle_group(&self, id: &str) {
        self.dispatch(Action::ToggleGroup { id: id.to_string() });
    }

    // ---- Notes ----

    /// Creates a note and makes it active. Returns the id of the new note,
    /// or `None` when the group does not exist.
    pub fn add_note(&self, group_id: &str, title: impl Into<String>) -> Option<String> {
        let id = new_id();
        let at = now_millis();
        self.dispatch(Action::AddNote {
            id: id.clone(),
            group_id: group_id.to_string(),
            title: title.into(),
            at,
        })
        .then_some(id)
    }

    pub fn rename_note(&self, id: &str, title: impl Into<String>) {
        self.dispatch(Action::RenameNote {
            id: id.to_string(),
            title: title.into(),
            at: now_millis(),
        });
    }

    pub fn delete_note(&self, id: &str) {
        self.dispatch(Action::DeleteNote { id: id.to_string() });
    }

    /// Unknown ids are ignored; `None` clears the selection.
    pub fn set_active_note(&self, id: Option<&str>) {
        self.dispatch(Action::SetActiveNote {
            id: id.map(str::to_string),
        });
    }

    // ---- Blocks ----

    /// Appends a block to a note. Returns the id of the new block, or `None`
    /// when the note does not exist.
    pub fn add_block(&self, note_id: &str, block: NewBlock) -> Option<String> {
        let block_id = new_id();
        self.dispatch(Action::AddBlock {
            note_id: note_id.to_string(),
            block_id: block_id.clone(),
            block,
            at: now_millis(),
        })
        .then_some(block_id)
    }

    pub fn update_block(&self, note_id: &str, block_id: &str, content: impl Into<String>) {
        self.dispatch(Action::UpdateBlock {
            note_id: note_id.to_string(),
            block_id: block_id.to_string(),
            content: content.into(),
            at: now_millis(),
        });
    }

    pub fn delete_block(&self, note_id: &str, block_id: &str) {
        self.dispatch(Action::DeleteBlock {
            note_id: note_id.to_string(),
            block_id: block_id.to_string(),
            at: now_millis(),
        });
    }
}

impl Default for NotesStore {
    fn default() -> Self {
        Self::new(NotesState::bootstrap(now_millis()))
    }
}

// ---- Tests ----
