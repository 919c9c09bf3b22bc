//! Distances between embeddings.

use crate::error::{EmbeddingError, Result};

/// Squared Euclidean (L2) distance.
///
/// Ranking key of [`crate::FlatL2Index`]; the square root would not change
/// the order.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Map a distance onto (0, 1], 1.0 meaning identical.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}
