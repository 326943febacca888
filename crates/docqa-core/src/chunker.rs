use serde::{Deserialize, Serialize};

use crate::types::{Document, DocumentChunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

/// Paragraph-based splitter. Paragraphs within the token budget become one
/// chunk each; longer ones are cut into overlapping word windows.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<DocumentChunk> {
        let mut all_chunks = Vec::new();
        for document in documents {
            all_chunks.extend(self.chunk_document(document));
        }
        tracing::info!(documents = documents.len(), chunks = all_chunks.len(), "chunked documents");
        all_chunks
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<DocumentChunk> {
        let normalized = document.text.replace("\r\n", "\n");
        let mut pieces = Vec::new();
        for paragraph in normalized.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if count_tokens(paragraph) <= self.config.max_tokens {
                pieces.push(paragraph.to_string());
            } else {
                pieces.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }

        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{}:{}", document.id, chunk_index),
                doc_id: document.id.clone(),
                doc_path: document.metadata.file_path.clone(),
                content,
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = ((self.config.max_tokens as f32 * WORDS_PER_TOKEN) as usize).max(1);
        let overlap_words = ((words_per_chunk as f32 * self.config.overlap_percent) as usize)
            .min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        chunks
    }
}

const WORDS_PER_TOKEN: f32 = 0.75;

/// Rough token estimate: one token per 0.75 words.
pub fn count_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / WORDS_PER_TOKEN) as usize
}
