use std::fs;

use docqa_core::config::{EmbeddingBackend, EmbeddingSettings, Settings};
use docqa_core::traits::Embedder;
use docqa_core::Error;
use docqa_embed::{build_embedder, resolve_model_dir, HashEmbedder, OpenAiEmbedder};
use tempfile::TempDir;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn settings_with(embedding: EmbeddingSettings) -> Settings {
    Settings { embedding, ..Settings::default() }
}

#[tokio::test]
async fn hash_embedder_shapes_and_determinism() {
    let settings = settings_with(EmbeddingSettings { backend: EmbeddingBackend::Hash, ..EmbeddingSettings::default() });
    let embedder = build_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    assert_eq!(embedder.dim(), 1024);
    assert!(embedder.id().starts_with("hash:"));

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_score_higher() {
    let embedder = HashEmbedder::new(256);
    let query = embedder.embed_text("How do I start a fire?");
    let near = embedder.embed_text("Start the fire with dry tinder.");
    let far = embedder.embed_text("Rainwater collection barrels");
    assert!(cosine(&query, &near) > cosine(&query, &far));
}

#[test]
fn case_and_punctuation_are_ignored() {
    let embedder = HashEmbedder::new(64);
    assert_eq!(embedder.embed_text("Fire, WATER!"), embedder.embed_text("fire water"));
}

#[test]
fn empty_text_is_still_a_unit_vector() {
    let embedder = HashEmbedder::new(8);
    let v = embedder.embed_text("   ");
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
}

#[test]
fn openai_backend_without_key_is_a_config_error() {
    let settings = EmbeddingSettings {
        backend: EmbeddingBackend::OpenAi,
        api_key_env: "DOCQA_TEST_EMBED_KEY_THAT_IS_NEVER_SET".to_string(),
        ..EmbeddingSettings::default()
    };
    let err = OpenAiEmbedder::from_settings(&settings).err().expect("missing key");
    assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("DOCQA_TEST_EMBED_KEY_THAT_IS_NEVER_SET")));
}

#[test]
fn relative_model_dir_resolves_against_config_dir() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("weights/bge")).unwrap();

    let dir = resolve_model_dir(Some("weights/bge"), tmp.path()).expect("resolve");
    assert_eq!(dir, tmp.path().join("weights/bge"));
    assert!(resolve_model_dir(Some("weights/missing"), tmp.path()).is_err());
}
