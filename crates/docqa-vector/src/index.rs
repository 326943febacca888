use chrono::Utc;
use lancedb::Table;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use docqa_core::traits::Embedder;
use docqa_core::types::DocumentChunk;
use docqa_core::{Error, Result};

use crate::manifest::IndexManifest;
use crate::schema::CHUNKS_TABLE;
use crate::table::{open_db, open_table};
use crate::writer::LanceDbIndexer;
use crate::StorageResultExt;

/// LanceDB database directory inside the storage directory.
pub const VECTORS_DIR: &str = "vectors";

/// A built or restored index. Read-only once constructed.
pub struct VectorIndex {
    pub(crate) table: Table,
    manifest: IndexManifest,
}

impl VectorIndex {
    /// Embed and persist `chunks` into `storage_dir`.
    ///
    /// Everything is written to a hidden sibling staging directory that is
    /// renamed into place only after the manifest lands, so a failed build
    /// leaves no storage directory behind.
    pub async fn build(
        storage_dir: &Path,
        chunks: &[DocumentChunk],
        embedder: &dyn Embedder,
        document_count: usize,
    ) -> Result<Self> {
        let staging = staging_dir(storage_dir)?;
        remove_stale_staging(storage_dir)?;
        fs::create_dir_all(&staging)?;

        if let Err(e) = write_index(&staging, chunks, embedder, document_count).await {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                tracing::warn!(dir = %staging.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }
        fs::rename(&staging, storage_dir)
            .storage_context(&format!("move {} into {}", staging.display(), storage_dir.display()))?;
        tracing::info!(dir = %storage_dir.display(), chunks = chunks.len(), "index persisted");

        Self::open(storage_dir).await
    }

    /// Restore a previously persisted index without touching any documents.
    pub async fn open(storage_dir: &Path) -> Result<Self> {
        if !storage_dir.is_dir() {
            return Err(Error::storage(format!("{} is not a directory", storage_dir.display())));
        }
        let manifest = IndexManifest::read(storage_dir)?;
        let db = open_db(&storage_dir.join(VECTORS_DIR)).await?;
        let table = open_table(&db, CHUNKS_TABLE).await?;
        Ok(Self { table, manifest })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub async fn len(&self) -> Result<usize> {
        self.table.count_rows(None).await.storage_context("count rows")
    }
}

async fn write_index(dir: &Path, chunks: &[DocumentChunk], embedder: &dyn Embedder, document_count: usize) -> Result<()> {
    let db = open_db(&dir.join(VECTORS_DIR)).await?;
    LanceDbIndexer::new(&db, CHUNKS_TABLE, embedder.dim())
        .index_chunks(chunks, embedder)
        .await?;
    IndexManifest {
        embedder_id: embedder.id().to_string(),
        dim: embedder.dim(),
        chunk_count: chunks.len(),
        document_count,
        created_at: Utc::now(),
    }
    .write(dir)
}

fn staging_prefix(name: &str) -> String {
    format!(".{}.staging-", name)
}

/// Drop staging directories left next to `storage_dir` by earlier builds
/// that never finished, whatever process created them.
fn remove_stale_staging(storage_dir: &Path) -> Result<()> {
    let Some(name) = storage_dir.file_name() else {
        return Ok(());
    };
    let prefix = staging_prefix(&name.to_string_lossy());
    let parent = storage_dir.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    if !parent.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(parent).min_depth(1).max_depth(1) {
        let entry = entry.storage_context("scan for stale staging directories")?;
        if entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with(&prefix) {
            tracing::warn!(dir = %entry.path().display(), "removing staging directory from an unfinished build");
            fs::remove_dir_all(entry.path())?;
        }
    }
    Ok(())
}

fn staging_dir(storage_dir: &Path) -> Result<PathBuf> {
    let name = storage_dir
        .file_name()
        .ok_or_else(|| Error::storage(format!("invalid storage path {}", storage_dir.display())))?;
    let staging_name = format!("{}{}", staging_prefix(&name.to_string_lossy()), std::process::id());
    match storage_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            Ok(parent.join(staging_name))
        }
        None => Ok(PathBuf::from(staging_name)),
    }
}
