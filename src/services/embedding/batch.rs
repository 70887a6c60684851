use futures::stream::{self, StreamExt, TryStreamExt};

use super::errors::EmbeddingError;
use super::traits::EmbeddingProvider;

/// Embed `texts` in fixed-size batches with bounded parallelism
///
/// Batches may complete in any order; results are merged back by batch
/// position so output `i` always belongs to input `i`. Every vector must share
/// the dimension of the first one.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let batch_size = batch_size.max(1);
    let concurrency = concurrency.max(1);

    // Owned batches keep the returned future `Send`
    let batches: Vec<Vec<String>> = texts.chunks(batch_size).map(<[String]>::to_vec).collect();
    let mut batches: Vec<(usize, Vec<Vec<f32>>)> = stream::iter(batches.into_iter().enumerate())
        .map(|(position, batch)| embed_batch_at(provider, position, batch))
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

    batches.sort_by_key(|(position, _)| *position);

    let vectors: Vec<Vec<f32>> = batches
        .into_iter()
        .flat_map(|(_, vectors)| vectors)
        .collect();

    let expected = vectors.first().map(Vec::len).unwrap_or_default();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: bad.len(),
        });
    }

    Ok(vectors)
}

async fn embed_batch_at(
    provider: &dyn EmbeddingProvider,
    position: usize,
    batch: Vec<String>,
) -> Result<(usize, Vec<Vec<f32>>), EmbeddingError> {
    let vectors = provider.embed_batch(&batch).await?;
    if vectors.len() != batch.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: batch.len(),
            actual: vectors.len(),
        });
    }
    tracing::trace!(batch = position, size = batch.len(), "Embedded batch");
    Ok((position, vectors))
}
