//! Routing of sidebar and editor input to store operations.
//!
//! Text typed by the user is trimmed here; blank names never reach the store.

use crate::model::NewBlock;
use crate::store::NotesStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Group(String),
    Note(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    CreateGroup { name: String },
    CreateNote { group_id: String, title: String },
    Rename { target: Target, value: String },
    Delete { target: Target },
    ToggleGroup { group_id: String },
    SelectNote { note_id: String },
    AddTextBlock { note_id: String },
    EditText { note_id: String, block_id: String, content: String },
    RemoveBlock { note_id: String, block_id: String },
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Applies a gesture. Returns the id of anything it created.
pub fn apply(store: &NotesStore, gesture: Gesture) -> Option<String> {
    match gesture {
        Gesture::CreateGroup { name } => {
            let name = non_blank(&name)?;
            Some(store.add_group(name.to_uppercase()))
        }
        Gesture::CreateNote { group_id, title } => {
            let title = non_blank(&title)?;
            let collapsed = store
                .snapshot()
                .group(&group_id)
                .map_or(false, |g| !g.is_open);
            if collapsed {
                store.toggle_group(&group_id);
            }
            store.add_note(&group_id, title)
        }
        Gesture::Rename { target, value } => {
            let value = non_blank(&value)?;
            match target {
                Target::Group(id) => store.rename_group(&id, value),
                Target::Note(id) => store.rename_note(&id, value),
            }
            None
        }
        Gesture::Delete { target } => {
            match target {
                Target::Group(id) => store.delete_group(&id),
                Target::Note(id) => store.delete_note(&id),
            }
            None
        }
        Gesture::ToggleGroup { group_id } => {
            store.toggle_group(&group_id);
            None
        }
        Gesture::SelectNote { note_id } => {
            store.set_active_note(Some(&note_id));
            None
        }
        Gesture::AddTextBlock { note_id } => store.add_block(&note_id, NewBlock::text("")),
        Gesture::EditText {
            note_id,
            block_id,
            content,
        } => {
            store.update_block(&note_id, &block_id, content);
            None
        }
        Gesture::RemoveBlock { note_id, block_id } => {
            store.delete_block(&note_id, &block_id);
            None
        }
    }
}
