//! Read-only projections for the sidebar and editor, and block export.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::ingest::decode_data_url;
use crate::model::{Block, BlockKind, Group, Note, NotesState};
use crate::util::sanitize_filename;

// Sidebar row for one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarGroup<'a> {
    pub group: &'a Group,
    /// Notes shown under the group; empty while collapsed
    pub notes: Vec<&'a Note>,
    pub note_count: usize,
}

/// Groups and their notes in stored order.
pub fn sidebar(state: &NotesState) -> Vec<SidebarGroup<'_>> {
    state
        .groups
        .iter()
        .map(|group| {
            let notes: Vec<&Note> = state.notes_in_group(&group.id).collect();
            let note_count = notes.len();
            SidebarGroup {
                group,
                notes: if group.is_open { notes } else { Vec::new() },
                note_count,
            }
        })
        .collect()
}

pub fn is_active(state: &NotesState, note_id: &str) -> bool {
    state.active_note_id.as_deref() == Some(note_id)
}

// ---- Export ----

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1;
    loop {
        let name = match ext {
            Some(ref ext) => format!("{}-{}.{}", stem, counter, ext),
            None => format!("{}-{}", stem, counter),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Writes the bytes behind an attachment block into `dir` under its original
/// file name. Existing files are never overwritten.
pub fn export_block(block: &Block, dir: &Path) -> Result<PathBuf> {
    if block.kind == BlockKind::Text {
        bail!("text block {} has no attachment", block.id);
    }
    let (_, bytes) = decode_data_url(&block.content)
        .with_context(|| format!("block {} does not hold a data URL", block.id))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create '{}'", dir.display()))?;
    let file_name = sanitize_filename(block.file_name.as_deref().unwrap_or(""), "untitled");
    let path = unique_path(dir, &file_name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(path)
}
