//! Turning files picked by the user into attachment blocks.
//!
//! Each file is read on its own task. Only a completed read appends a block;
//! a failed read is logged and leaves the note untouched. Tasks finish in any
//! order, so blocks from one selection may be appended out of selection order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use tokio::fs;
use tokio::task::JoinHandle;

use crate::model::{BlockKind, NewBlock};
use crate::store::NotesStore;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a regular file")]
    NotAFile(PathBuf),
}

/// A file selected for upload. `mime_type` is what the picker reported, if
/// anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub path: PathBuf,
    pub mime_type: Option<String>,
}

impl FileUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }

    pub fn resolved_mime_type(&self) -> String {
        match self.mime_type.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => mime_type_for_path(&self.path).to_string(),
        }
    }
}

// ---- Encoding ----

pub fn mime_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_MIME_TYPE;
    };
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => DEFAULT_MIME_TYPE,
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Splits a base64 data URL into its MIME type and decoded bytes.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    let mime_type = if mime_type.is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    Some((mime_type.to_string(), bytes))
}

pub fn block_from_bytes(upload: &FileUpload, bytes: &[u8]) -> NewBlock {
    let mime_type = upload.resolved_mime_type();
    NewBlock::attachment(
        BlockKind::for_mime_type(&mime_type),
        encode_data_url(&mime_type, bytes),
        upload.file_name(),
        mime_type,
    )
}

// ---- Reading ----

pub async fn read_upload(upload: &FileUpload) -> Result<NewBlock, IngestError> {
    let read_err = |source| IngestError::Read {
        path: upload.path.clone(),
        source,
    };

    let metadata = fs::metadata(&upload.path).await.map_err(read_err)?;
    if !metadata.is_file() {
        return Err(IngestError::NotAFile(upload.path.clone()));
    }
    let bytes = fs::read(&upload.path).await.map_err(read_err)?;
    Ok(block_from_bytes(upload, &bytes))
}

/// Reads one file and appends it to the note. Returns the new block id.
pub async fn ingest_file(
    store: &NotesStore,
    note_id: &str,
    upload: &FileUpload,
) -> Result<Option<String>, IngestError> {
    let block = read_upload(upload).await?;
    let kind = block.kind;
    let block_id = store.add_block(note_id, block);
    match block_id {
        Some(ref id) => log::debug!(
            "[INGEST] Added {} block {} from {}",
            kind.as_str(),
            id,
            upload.path.display()
        ),
        None => log::info!(
            "[INGEST] Note {} disappeared before {} finished loading",
            note_id,
            upload.path.display()
        ),
    }
    Ok(block_id)
}

/// Spawns one independent task per file. Must be called inside a Tokio
/// runtime.
pub fn ingest_files(
    store: Arc<NotesStore>,
    note_id: &str,
    uploads: Vec<FileUpload>,
) -> Vec<JoinHandle<Option<String>>> {
    uploads
        .into_iter()
        .map(|upload| {
            let store = Arc::clone(&store);
            let note_id = note_id.to_string();
            tokio::spawn(async move {
                match ingest_file(&store, &note_id, &upload).await {
                    Ok(block_id) => block_id,
                    Err(e) => {
                        log::error!("[INGEST] {}", e);
                        None
                    }
                }
            })
        })
        .collect()
}

// ---- Tests ----
