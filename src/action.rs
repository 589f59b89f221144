//! Pure state transitions.
//!
//! Every store mutation is an [`Action`] applied to the current snapshot.
//! Fresh ids and timestamps are carried inside the action so that
//! [`reduce`] stays deterministic. `None` means the action did not apply
//! (an id it refers to is absent) and the snapshot is left as is.

use crate::model::{Block, Group, NewBlock, Note, NotesState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddGroup {
        id: String,
        name: String,
        at: i64,
    },
    RenameGroup {
        id: String,
        name: String,
    },
    DeleteGroup {
        id: String,
    },
    ToggleGroup {
        id: String,
    },
    AddNote {
        id: String,
        group_id: String,
        title: String,
        at: i64,
    },
    RenameNote {
        id: String,
        title: String,
        at: i64,
    },
    DeleteNote {
        id: String,
    },
    SetActiveNote {
        id: Option<String>,
    },
    AddBlock {
        note_id: String,
        block_id: String,
        block: NewBlock,
        at: i64,
    },
    UpdateBlock {
        note_id: String,
        block_id: String,
        content: String,
        at: i64,
    },
    DeleteBlock {
        note_id: String,
        block_id: String,
        at: i64,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddGroup { .. } => "add_group",
            Action::RenameGroup { .. } => "rename_group",
            Action::DeleteGroup { .. } => "delete_group",
            Action::ToggleGroup { .. } => "toggle_group",
            Action::AddNote { .. } => "add_note",
            Action::RenameNote { .. } => "rename_note",
            Action::DeleteNote { .. } => "delete_note",
            Action::SetActiveNote { .. } => "set_active_note",
            Action::AddBlock { .. } => "add_block",
            Action::UpdateBlock { .. } => "update_block",
            Action::DeleteBlock { .. } => "delete_block",
        }
    }
}

// ---- Find-or-skip ----

// The single place where "unknown id means no-op" is decided.
fn with_group(
    state: &NotesState,
    id: &str,
    f: impl FnOnce(&mut Group),
) -> Option<NotesState> {
    let index = state.groups.iter().position(|g| g.id == id)?;
    let mut next = state.clone();
    f(&mut next.groups[index]);
    Some(next)
}

fn with_note(
    state: &NotesState,
    id: &str,
    f: impl FnOnce(&mut Note) -> Option<()>,
) -> Option<NotesState> {
    let index = state.notes.iter().position(|n| n.id == id)?;
    let mut next = state.clone();
    f(&mut next.notes[index])?;
    Some(next)
}

fn block_index(note: &Note, block_id: &str) -> Option<usize> {
    note.blocks.iter().position(|b| b.id == block_id)
}

// ---- Reducer ----

pub fn reduce(state: &NotesState, action: Action) -> Option<NotesState> {
    match action {
        Action::AddGroup { id, name, at } => {
            let mut next = state.clone();
            next.groups.push(Group {
                id,
                name,
                is_open: true,
                created_at: at,
            });
            Some(next)
        }

        Action::RenameGroup { id, name } => with_group(state, &id, |g| g.name = name),

        Action::ToggleGroup { id } => with_group(state, &id, |g| g.is_open = !g.is_open),

        Action::DeleteGroup { id } => {
            state.group(&id)?;
            let active_in_group = state
                .active_note()
                .map_or(false, |n| n.group_id == id);

            let mut next = state.clone();
            next.groups.retain(|g| g.id != id);
            next.notes.retain(|n| n.group_id != id);
            if active_in_group {
                next.active_note_id = None;
            }
            Some(next)
        }

        Action::AddNote {
            id,
            group_id,
            title,
            at,
        } => {
            // A note may only live under an existing group.
            state.group(&group_id)?;
            let mut next = state.clone();
            next.notes.push(Note {
                id: id.clone(),
                title,
                group_id,
                blocks: Vec::new(),
                created_at: at,
                updated_at: at,
            });
            next.active_note_id = Some(id);
            Some(next)
        }

        Action::RenameNote { id, title, at } => with_note(state, &id, |n| {
            n.title = title;
            n.touch(at);
            Some(())
        }),

        Action::DeleteNote { id } => {
            state.note(&id)?;
            let mut next = state.clone();
            next.notes.retain(|n| n.id != id);
            if next.active_note_id.as_deref() == Some(id.as_str()) {
                next.active_note_id = None;
            }
            Some(next)
        }

        Action::SetActiveNote { id } => {
            if let Some(ref id) = id {
                state.note(id)?;
            }
            let mut next = state.clone();
            next.active_note_id = id;
            Some(next)
        }

        Action::AddBlock {
            note_id,
            block_id,
            block,
            at,
        } => with_note(state, &note_id, |n| {
            n.blocks.push(block.with_id(block_id));
            n.touch(at);
            Some(())
        }),

        Action::UpdateBlock {
            note_id,
            block_id,
            content,
            at,
        } => with_note(state, &note_id, |n| {
            let index = block_index(n, &block_id)?;
            let block: &mut Block = &mut n.blocks[index];
            block.content = content;
            n.touch(at);
            Some(())
        }),

        Action::DeleteBlock {
            note_id,
            block_id,
            at,
        } => with_note(state, &note_id, |n| {
            let index = block_index(n, &block_id)?;
            n.blocks.remove(index);
            n.touch(at);
            Some(())
        }),
    }
}

// ---- Tests ----
