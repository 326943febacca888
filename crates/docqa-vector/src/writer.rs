use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;

use docqa_core::traits::Embedder;
use docqa_core::types::DocumentChunk;
use docqa_core::{Error, Result};

use crate::schema::build_arrow_schema;
use crate::StorageResultExt;

const EMBED_BATCH_SIZE: usize = 32;

pub struct LanceDbIndexer<'a> {
    db: &'a Connection,
    table_name: String,
    dim: usize,
}

impl<'a> LanceDbIndexer<'a> {
    pub fn new(db: &'a Connection, table_name: &str, dim: usize) -> Self {
        Self { db, table_name: table_name.to_string(), dim }
    }

    /// Embed `chunks` in batches and write them as a new table.
    pub async fn index_chunks(&self, chunks: &[DocumentChunk], embedder: &dyn Embedder) -> Result<()> {
        if chunks.is_empty() {
            return Err(Error::storage("no chunks to index"));
        }
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            embeddings.extend(embedder.embed_batch(&texts).await?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        self.index(chunks, &embeddings).await
    }

    pub async fn index(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::embedding(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
            return Err(Error::embedding(format!("expected {} dims, got {}", self.dim, bad.len())));
        }
        tracing::info!(chunks = chunks.len(), table = %self.table_name, "writing vectors");

        let record_batch = self.chunks_to_record_batch(chunks, embeddings)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        self.db
            .create_table(&self.table_name, reader)
            .execute()
            .await
            .storage_context("create table")?;
        Ok(())
    }

    fn chunks_to_record_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.dim);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let doc_ids: Vec<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
        let doc_paths: Vec<&str> = chunks.iter().map(|c| c.doc_path.as_str()).collect();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index as i32).collect();
        let total_chunks: Vec<i32> = chunks.iter().map(|c| c.total_chunks as i32).collect();
        let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

        RecordBatch::try_new(schema, vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(StringArray::from(doc_paths)),
            Arc::new(StringArray::from(contents)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(Int32Array::from(total_chunks)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, self.dim as i32)),
        ])
        .storage_context("build record batch")
    }
}
