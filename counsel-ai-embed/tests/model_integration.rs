//! Integration tests that exercise the real embedding model. Ignored by
//! default because the first run downloads model weights.

use counsel_ai_embed::{EmbedConfig, FastEmbedProvider, NormalizedEmbedder, Result};
use std::sync::Arc;

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_real_model_produces_normalized_vectors() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = EmbedConfig::default();
    let target = config.target_dimension;
    let provider = FastEmbedProvider::create(config).await?;
    let embedder = NormalizedEmbedder::new(Arc::new(provider), target);

    let vector = embedder
        .embed_text("The indemnification clause survives termination.")
        .await?;
    assert_eq!(vector.len(), target);

    // L2-normalized output.
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-3);

    // Deterministic for identical input.
    let again = embedder
        .embed_text("The indemnification clause survives termination.")
        .await?;
    assert_eq!(vector, again);
    Ok(())
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_batch_matches_single() -> Result<()> {
    let config = EmbedConfig::default();
    let target = config.target_dimension;
    let provider = FastEmbedProvider::create(config).await?;
    let embedder = NormalizedEmbedder::new(Arc::new(provider), target);

    let texts = vec![
        "Payment is due within thirty days.".to_string(),
        "Either party may terminate with notice.".to_string(),
    ];
    let batch = embedder.embed_texts(&texts).await?;
    assert_eq!(batch.embeddings.len(), 2);

    let single = embedder.embed_text(&texts[0]).await?;
    assert_eq!(batch.embeddings[0], single);
    Ok(())
}
