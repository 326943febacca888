//! Startup decision between building a new index and restoring a persisted one.

use std::path::Path;

use docqa_core::chunker::Chunker;
use docqa_core::config::Settings;
use docqa_core::loader::{DocumentLoader, LoaderOptions};
use docqa_core::traits::Embedder;
use docqa_core::{Error, LoadError, Result};
use docqa_vector::VectorIndex;

/// Which path produced the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Built,
    Loaded,
}

/// Storage present: open it, and let failures propagate. Storage absent:
/// build from the document folder; a failure there is logged and yields
/// `None`, leaving the engine without an index.
pub async fn prepare_index(settings: &Settings, embedder: &dyn Embedder) -> Result<Option<(VectorIndex, IndexSource)>> {
    let storage_dir = settings.storage_dir();
    if storage_dir.exists() {
        tracing::info!(dir = %storage_dir.display(), "loading index from persisted storage");
        let index = load_index(&storage_dir, embedder).await?;
        tracing::info!(chunks = index.manifest().chunk_count, "index loaded");
        return Ok(Some((index, IndexSource::Loaded)));
    }

    tracing::info!(dir = %settings.data_dir().display(), "no persisted storage, building index from documents");
    match build_index(settings, embedder).await {
        Ok(index) => Ok(Some((index, IndexSource::Built))),
        Err(e) => {
            tracing::error!(error = %e, "index build failed; continuing without an index");
            Ok(None)
        }
    }
}

pub async fn build_index(settings: &Settings, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let data_dir = settings.data_dir();
    let loader = DocumentLoader::with_options(&data_dir, LoaderOptions::from(&settings.data));
    let documents = loader.load()?;
    let chunks = Chunker::new(settings.chunking.clone()).chunk_documents(&documents);
    if chunks.is_empty() {
        return Err(LoadError::NoContent(data_dir).into());
    }
    VectorIndex::build(&settings.storage_dir(), &chunks, embedder, documents.len()).await
}

pub async fn load_index(storage_dir: &Path, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let index = VectorIndex::open(storage_dir).await?;
    let manifest = index.manifest();
    if manifest.dim != embedder.dim() {
        return Err(Error::storage(format!(
            "persisted index has {} dims but embedder '{}' produces {}",
            manifest.dim,
            embedder.id(),
            embedder.dim()
        )));
    }
    if manifest.embedder_id != embedder.id() {
        tracing::warn!(
            persisted = %manifest.embedder_id,
            configured = %embedder.id(),
            "index was built with a different embedder; results may be poor"
        );
    }
    Ok(index)
}
