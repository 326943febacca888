use serde::Serialize;
use std::fmt;

use docqa_core::prompt::PromptTemplate;
use docqa_core::traits::{Embedder, LanguageModel};
use docqa_core::types::SearchHit;
use docqa_core::{Error, Result};
use docqa_vector::VectorIndex;

use crate::bootstrap::IndexSource;

/// Number of chunks retrieved per question.
pub const SIMILARITY_TOP_K: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SearchHit>,
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.answer)
    }
}

/// Retrieval + prompt + completion over one index.
pub struct QueryEngine {
    index: Option<VectorIndex>,
    index_source: Option<IndexSource>,
    embedder: Box<dyn Embedder>,
    template: PromptTemplate,
    llm: Box<dyn LanguageModel>,
}

impl QueryEngine {
    pub fn new(
        index: Option<(VectorIndex, IndexSource)>,
        embedder: Box<dyn Embedder>,
        template: PromptTemplate,
        llm: Box<dyn LanguageModel>,
    ) -> Self {
        let (index, index_source) = match index {
            Some((index, source)) => (Some(index), Some(source)),
            None => (None, None),
        };
        Self { index, index_source, embedder, template, llm }
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn index_source(&self) -> Option<IndexSource> {
        self.index_source
    }

    pub fn similarity_top_k(&self) -> usize {
        SIMILARITY_TOP_K
    }

    /// Up to `SIMILARITY_TOP_K` chunks, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>> {
        let index = self.index.as_ref().ok_or(Error::IndexUnavailable)?;
        let query_vec = self
            .embedder
            .embed_batch(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("embedder returned no vector for the question"))?;
        index.search(&query_vec, SIMILARITY_TOP_K).await
    }

    pub fn build_prompt(&self, question: &str, hits: &[SearchHit]) -> String {
        self.template.format(&build_context(hits), question)
    }

    /// Provider failures are returned as-is; nothing is retried.
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        let sources = self.retrieve(question).await?;
        let prompt = self.build_prompt(question, &sources);
        tracing::debug!(hits = sources.len(), prompt_chars = prompt.len(), "querying language model");
        let answer = self.llm.complete(&prompt).await?;
        Ok(QueryResponse { answer, sources })
    }
}

/// Each chunk is prefixed with its source path; chunks are separated by a blank line.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("file_path: {}\n\n{}", h.doc_path, h.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
