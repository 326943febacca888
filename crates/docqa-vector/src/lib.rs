//! docqa-vector
//!
//! Persisted vector index over document chunks, stored as a LanceDB table plus
//! a JSON manifest inside one storage directory.

pub mod index;
pub mod manifest;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use index::VectorIndex;
pub use manifest::IndexManifest;
pub use writer::LanceDbIndexer;

use docqa_core::{Error, Result};

/// Maps foreign errors into `Error::Storage` with a short label.
pub(crate) trait StorageResultExt<T> {
    fn storage_context(self, what: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> StorageResultExt<T> for std::result::Result<T, E> {
    fn storage_context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::storage(format!("{}: {}", what, e)))
    }
}
