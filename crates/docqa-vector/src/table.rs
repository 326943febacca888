//! LanceDB connection helpers.

use lancedb::{connect, Connection, Table};
use std::path::Path;

use docqa_core::Result;

use crate::StorageResultExt;

pub async fn open_db(path: &Path) -> Result<Connection> {
    connect(path.to_string_lossy().as_ref())
        .execute()
        .await
        .storage_context("connect")
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<Table> {
    let names = conn.table_names().execute().await.storage_context("list tables")?;
    if !names.iter().any(|n| n == name) {
        return Err(docqa_core::Error::storage(format!("table '{}' not found", name)));
    }
    conn.open_table(name).execute().await.storage_context("open table")
}
