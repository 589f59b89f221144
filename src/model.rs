use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_GROUP_ID: &str = "default";
pub const DEFAULT_GROUP_NAME: &str = "NOTES";
pub const WELCOME_NOTE_ID: &str = "welcome";
pub const WELCOME_NOTE_TITLE: &str = "welcome";
pub const WELCOME_BLOCK_ID: &str = "b1";
pub const WELCOME_TEXT: &str = "# Welcome to your notes!\n\nStart writing here. You can add text, images, videos and files.";

// ---- Block Types ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Video,
    File,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::File => "file",
        }
    }

    /// Three-way classification of an uploaded file by its MIME type.
    pub fn for_mime_type(mime_type: &str) -> Self {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if mime_type.starts_with("image/") {
            BlockKind::Image
        } else if mime_type.starts_with("video/") {
            BlockKind::Video
        } else {
            BlockKind::File
        }
    }

    /// Image and video blocks can be rendered inline.
    pub fn is_inline_media(&self) -> bool {
        matches!(self, BlockKind::Image | BlockKind::Video)
    }
}

/// One unit of note content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Literal text for text blocks, a data URL otherwise
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A block payload that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub kind: BlockKind,
    pub content: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl NewBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            content: content.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn attachment(
        kind: BlockKind,
        content: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            file_name: Some(file_name.into()),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn with_id(self, id: String) -> Block {
        Block {
            id,
            kind: self.kind,
            content: self.content,
            file_name: self.file_name,
            mime_type: self.mime_type,
        }
    }
}

// ---- Notes & Groups ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default)]
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub group_id: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Note {
    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    /// Bumps `updated_at` without ever moving it backwards.
    pub fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now);
    }
}

// ---- Snapshot ----

/// The complete state of groups, notes and the active-note pointer at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesState {
    pub groups: Vec<Group>,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub active_note_id: Option<String>,
}

impl NotesState {
    /// State used when nothing has been persisted yet.
    pub fn bootstrap(now: i64) -> Self {
        Self {
            groups: vec![Group {
                id: DEFAULT_GROUP_ID.to_string(),
                name: DEFAULT_GROUP_NAME.to_string(),
                is_open: true,
                created_at: now,
            }],
            notes: vec![Note {
                id: WELCOME_NOTE_ID.to_string(),
                title: WELCOME_NOTE_TITLE.to_string(),
                group_id: DEFAULT_GROUP_ID.to_string(),
                blocks: vec![NewBlock::text(WELCOME_TEXT).with_id(WELCOME_BLOCK_ID.to_string())],
                created_at: now,
                updated_at: now,
            }],
            active_note_id: Some(WELCOME_NOTE_ID.to_string()),
        }
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active_note_id.as_deref().and_then(|id| self.note(id))
    }

    pub fn notes_in_group<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a Note> + 'a {
        self.notes.iter().filter(move |n| n.group_id == group_id)
    }

    /// Drops notes whose group is gone and clears a dangling active note.
    /// Returns the number of repairs made.
    pub fn repair(&mut self) -> usize {
        let before = self.notes.len();
        let groups = &self.groups;
        self.notes
            .retain(|n| groups.iter().any(|g| g.id == n.group_id));
        let mut repairs = before - self.notes.len();

        if let Some(active) = self.active_note_id.as_deref() {
            if self.note(active).is_none() {
                self.active_note_id = None;
                repairs += 1;
            }
        }

        repairs
    }

    /// True when every note points at an existing group and the active
    /// note, if any, exists.
    pub fn is_consistent(&self) -> bool {
        let notes_ok = self
            .notes
            .iter()
            .all(|n| self.group(&n.group_id).is_some());
        let active_ok = match self.active_note_id.as_deref() {
            Some(id) => self.note(id).is_some(),
            None => true,
        };
        notes_ok && active_ok
    }
}

// ---- Helpers ----

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_kind_for_mime_type() {
        assert_eq!(BlockKind::for_mime_type("image/png"), BlockKind::Image);
        assert_eq!(BlockKind::for_mime_type("IMAGE/JPEG"), BlockKind::Image);
        assert_eq!(BlockKind::for_mime_type("video/mp4"), BlockKind::Video);
        assert_eq!(BlockKind::for_mime_type("application/pdf"), BlockKind::File);
        assert_eq!(BlockKind::for_mime_type(""), BlockKind::File);
        assert_eq!(BlockKind::for_mime_type("imagery/x"), BlockKind::File);
        assert!(BlockKind::Video.is_inline_media());
        assert!(!BlockKind::File.is_inline_media());
    }

    #[test]
    fn test_block_serializes_with_type_and_optional_metadata() {
        let text = NewBlock::text("hello").with_id("a".to_string());
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({ "id": "a", "type": "text", "content": "hello" })
        );

        let image = NewBlock::attachment(
            BlockKind::Image,
            "data:image/png;base64,AAAA",
            "cat.png",
            "image/png",
        )
        .with_id("b".to_string());
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({
                "id": "b",
                "type": "image",
                "content": "data:image/png;base64,AAAA",
                "fileName": "cat.png",
                "mimeType": "image/png"
            })
        );
    }

    #[test]
    fn test_group_defaults_when_fields_missing() {
        let group: Group = serde_json::from_value(json!({ "id": "g", "name": "WORK" })).unwrap();
        assert!(group.is_open);
        assert_eq!(group.created_at, 0);
    }

    #[test]
    fn test_bootstrap_state() {
        let state = NotesState::bootstrap(42);
        assert_eq!(state.groups.len(), 1);
        assert_eq!(state.groups[0].id, DEFAULT_GROUP_ID);
        assert_eq!(state.groups[0].name, "NOTES");
        assert!(state.groups[0].is_open);
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.notes[0].group_id, DEFAULT_GROUP_ID);
        assert_eq!(state.notes[0].blocks.len(), 1);
        assert_eq!(state.notes[0].blocks[0].kind, BlockKind::Text);
        assert_eq!(state.active_note_id.as_deref(), Some(WELCOME_NOTE_ID));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_repair_drops_orphans_and_dangling_active() {
        let mut state = NotesState::bootstrap(1);
        state.notes.push(Note {
            id: "orphan".to_string(),
            title: "lost".to_string(),
            group_id: "gone".to_string(),
            blocks: vec![],
            created_at: 1,
            updated_at: 1,
        });
        state.active_note_id = Some("orphan".to_string());
        assert!(!state.is_consistent());

        assert_eq!(state.repair(), 2);
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.active_note_id, None);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut note = NotesState::bootstrap(100).notes.remove(0);
        note.touch(50);
        assert_eq!(note.updated_at, 100);
        note.touch(150);
        assert_eq!(note.updated_at, 150);
    }

    #[test]
    fn test_new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
