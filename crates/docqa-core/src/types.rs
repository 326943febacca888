//! Domain types shared by the loader, the index and the query engine.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Source metadata captured when a file is read.
///
/// Dates are formatted `YYYY-MM-DD` and are absent when the filesystem does
/// not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size: u64,
    pub creation_date: Option<String>,
    pub last_modified_date: Option<String>,
}

/// One file's text as read from the document folder. Immutable once loaded.
///
/// `id` is the path relative to the document folder, which keeps it unique
/// when the folder is read recursively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A chunk of a source document that is independently embedded and retrieved.
///
/// - `id`: `<doc_id>:<chunk_index>`
/// - `doc_id`: the parent `Document::id`
/// - `doc_path`: original path to the source file
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A retrieved chunk. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub content: String,
    pub score: f32,
}
