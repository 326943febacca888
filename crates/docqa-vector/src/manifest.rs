use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use docqa_core::{Error, Result};

pub const MANIFEST_FILE: &str = "index_meta.json";

/// Written next to the vectors once a build succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_count: usize,
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn read(storage_dir: &Path) -> Result<Self> {
        let path = storage_dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::storage(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, storage_dir: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(storage_dir.join(MANIFEST_FILE), text)?;
        Ok(())
    }
}
