//! docqa-engine
//!
//! Startup wiring: build or restore the vector index, then bind it to the
//! prompt template and language model as a `QueryEngine`.

pub mod bootstrap;
pub mod engine;

pub use bootstrap::{build_index, load_index, prepare_index, IndexSource};
pub use engine::{build_context, QueryEngine, QueryResponse, SIMILARITY_TOP_K};

use docqa_core::config::Settings;
use docqa_core::prompt::PromptTemplate;
use docqa_core::traits::{Embedder, LanguageModel};
use docqa_core::Result;

/// Assemble the engine from settings. Template, model and embedder are
/// configured before any document is read, so configuration errors surface
/// without building an index first.
pub async fn bootstrap(settings: &Settings) -> Result<QueryEngine> {
    let template = PromptTemplate::from_settings(&settings.prompt, &settings.base_dir)?;
    let llm = docqa_llm::build_language_model(&settings.llm)?;
    let embedder = docqa_embed::build_embedder(settings)?;
    let index = prepare_index(settings, embedder.as_ref()).await?;
    Ok(QueryEngine::new(index, embedder, template, llm))
}

/// Same as `bootstrap` with caller-supplied embedder and model.
pub async fn bootstrap_with(
    settings: &Settings,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
) -> Result<QueryEngine> {
    let template = PromptTemplate::from_settings(&settings.prompt, &settings.base_dir)?;
    let index = prepare_index(settings, embedder.as_ref()).await?;
    Ok(QueryEngine::new(index, embedder, template, llm))
}
