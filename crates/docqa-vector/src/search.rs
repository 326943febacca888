use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use docqa_core::types::SearchHit;
use docqa_core::{Error, Result};

use crate::index::VectorIndex;
use crate::StorageResultExt;

impl VectorIndex {
    /// Top-`k` chunks by cosine similarity, best first. Ties break on chunk id
    /// so a restored index orders results exactly like the one that was built.
    ///
    /// The nearest-neighbour window is widened until it holds every chunk
    /// tied with the k-th score, otherwise LanceDB would pick which tied
    /// chunks make the cut.
    pub async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query_vec.len() != self.manifest().dim {
            return Err(Error::embedding(format!(
                "query has {} dims, index expects {}",
                query_vec.len(),
                self.manifest().dim
            )));
        }
        let total = self.len().await?;
        let mut limit = (k + 1).min(total.max(1));
        loop {
            let mut hits = self.nearest(query_vec, limit).await?;
            hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
            let window_full = hits.len() == limit && limit < total;
            let tie_at_edge = hits.len() > k && hits[k - 1].score == hits[hits.len() - 1].score;
            if window_full && tie_at_edge {
                limit = (limit * 2).min(total);
                tracing::debug!(limit, "scores tied at the cut-off, widening search window");
                continue;
            }
            hits.truncate(k);
            return Ok(hits);
        }
    }

    async fn nearest(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let mut stream = self
            .table
            .vector_search(query_vec.to_vec())
            .storage_context("vector search")?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .storage_context("vector search")?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.storage_context("read search results")? {
            hits.extend(hits_from_batch(&batch)?);
        }
        Ok(hits)
    }
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let ids = string_column(batch, "id")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let doc_paths = string_column(batch, "doc_path")?;
    let contents = string_column(batch, "content")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::storage("search result has no _distance column"))?;

    Ok((0..batch.num_rows())
        .filter(|&i| distances.is_valid(i))
        .map(|i| SearchHit {
            id: ids.value(i).to_string(),
            doc_id: doc_ids.value(i).to_string(),
            doc_path: doc_paths.value(i).to_string(),
            content: contents.value(i).to_string(),
            score: 1.0 - distances.value(i),
        })
        .collect())
}

fn string_column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::storage(format!("search result has no '{}' column", name)))
}
