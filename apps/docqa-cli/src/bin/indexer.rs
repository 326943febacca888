use docqa_engine::{prepare_index, IndexSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = docqa_cli::init()?;
    let embedder = docqa_embed::build_embedder(&settings)?;

    println!("docqa indexer\n=============");
    println!("Data directory: {}", settings.data_dir().display());
    println!("Storage directory: {}", settings.storage_dir().display());

    match prepare_index(&settings, embedder.as_ref()).await? {
        Some((index, source)) => {
            let verb = match source {
                IndexSource::Built => "Built",
                IndexSource::Loaded => "Loaded",
            };
            let manifest = index.manifest();
            println!("\n✅ {} index: {} chunks from {} documents", verb, index.len().await?, manifest.document_count);
            println!("📊 Embedder: {} (created {})", manifest.embedder_id, manifest.created_at.format("%Y-%m-%d %H:%M:%S"));
        }
        None => {
            println!("\n❌ Index build failed; see the log above.");
            std::process::exit(1);
        }
    }
    Ok(())
}
