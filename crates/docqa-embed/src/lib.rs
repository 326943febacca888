//! docqa-embed
//!
//! Text embedding backends: OpenAI's hosted embeddings, a local BGE-M3 model
//! run through candle, and a deterministic hashed bag-of-words embedder for
//! tests and offline work.
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the hashed backend regardless of config.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use docqa_core::config::{expand_path, resolve_with_base, EmbeddingBackend, Settings};
use docqa_core::traits::Embedder;
use docqa_core::Error;

pub mod openai;
pub mod pool;
pub mod tokenize;

pub use openai::OpenAiEmbedder;
pub use pool::masked_mean_l2;

pub const BGE_M3_DIM: usize = 1024;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    id: String,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, max_len, id: format!("bge-m3:d{}", BGE_M3_DIM) })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != BGE_M3_DIM {
            return Err(anyhow!("expected {} dims, model produced {}", BGE_M3_DIM, emb.len()));
        }
        if start.elapsed().as_millis() > 100 {
            tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { BGE_M3_DIM }
    fn max_len(&self) -> usize { self.max_len }

    async fn embed_batch(&self, texts: &[String]) -> docqa_core::Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_text(t).map_err(|e| Error::embedding(format!("{e:#}"))))
            .collect()
    }
}

/// Hashes each lowercased word into one of `dim` buckets, then L2-normalises.
/// Texts sharing words land close together, which is enough for retrieval tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{}", dim) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            // Empty input still needs a unit vector for cosine search.
            v[0] = 1.0;
            return v;
        }
        for x in &mut v { *x /= norm; }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    async fn embed_batch(&self, texts: &[String]) -> docqa_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Backend named by `settings.embedding`, unless `APP_USE_FAKE_EMBEDDINGS` forces the hash one.
pub fn build_embedder(settings: &Settings) -> docqa_core::Result<Box<dyn Embedder>> {
    let embedding = &settings.embedding;
    if use_fake_embeddings() {
        tracing::info!("APP_USE_FAKE_EMBEDDINGS set, using hash embedder");
        return Ok(Box::new(HashEmbedder::new(embedding.dim)));
    }
    let embedder: Box<dyn Embedder> = match embedding.backend {
        EmbeddingBackend::Hash => Box::new(HashEmbedder::new(embedding.dim)),
        EmbeddingBackend::OpenAi => Box::new(OpenAiEmbedder::from_settings(embedding)?),
        EmbeddingBackend::BgeM3 => {
            let load = resolve_model_dir(embedding.model_dir.as_deref(), &settings.base_dir)
                .and_then(|dir| EmbeddingModel::load(&dir, embedding.max_len));
            Box::new(load.map_err(|e| Error::embedding(format!("{e:#}")))?)
        }
    };
    tracing::info!(embedder = embedder.id(), dim = embedder.dim(), "embedder configured");
    Ok(embedder)
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(dev) => {
            tracing::info!("embedding on Metal");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "Metal unavailable, falling back to CPU"),
    }
    tracing::info!("embedding on CPU");
    Device::Cpu
}

fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// BGE-M3 directory: `embedding.model_dir` (relative to `base_dir`), then
/// `APP_MODEL_DIR` / `MODEL_DIR`, then `models/bge-m3` under `base_dir`.
pub fn resolve_model_dir(configured: Option<&str>, base_dir: &Path) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = resolve_with_base(base_dir, dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("embedding.model_dir {} does not exist", p.display()));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.exists() {
                tracing::info!("using {}: {}", var, p.display());
                return Ok(p);
            }
        }
    }
    let local = base_dir.join("models/bge-m3");
    if local.exists() { return Ok(local); }
    Err(anyhow!("Could not locate BGE-M3 model directory; set embedding.model_dir or APP_MODEL_DIR"))
}
