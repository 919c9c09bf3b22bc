//! Exact nearest-neighbour index over embeddings.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::squared_euclidean;

/// A search hit: the insertion position of the vector and its squared L2
/// distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position of the vector in insertion order.
    pub position: usize,

    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// A brute-force index keyed on squared Euclidean distance.
///
/// Every vector is compared against the query, so results are exact.
/// Vectors are identified by insertion position, which lets callers keep a
/// parallel list of payloads (documents) without an id map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatL2Index {
    /// Stored vectors in insertion order.
    vectors: Vec<Embedding>,

    /// Expected dimension of embeddings.
    dimension: usize,
}

impl FlatL2Index {
    /// Create a new empty index.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
        }
    }

    /// Expected dimension of vectors in this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add a vector, returning its position.
    pub fn add(&mut self, embedding: Embedding) -> Result<usize> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        self.vectors.push(embedding);
        let position = self.vectors.len() - 1;
        debug!("Added vector {position} to L2 index");
        Ok(position)
    }

    /// Add many vectors in order.
    pub fn add_all(&mut self, embeddings: impl IntoIterator<Item = Embedding>) -> Result<()> {
        for embedding in embeddings {
            self.add(embedding)?;
        }
        info!("L2 index holds {} vectors", self.vectors.len());
        Ok(())
    }

    /// Get the vector stored at a position.
    pub fn get(&self, position: usize) -> Option<&Embedding> {
        self.vectors.get(position)
    }

    /// Get the number of vectors in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Find the `k` nearest vectors in ascending distance order.
    ///
    /// Equal distances keep insertion order. Returns every vector when the
    /// index holds fewer than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = Vec::with_capacity(self.vectors.len());
        for (position, vector) in self.vectors.iter().enumerate() {
            scored.push((OrderedFloat(squared_euclidean(query, vector)?), position));
        }

        // Stable sort: ties stay in insertion order.
        scored.sort_by_key(|(distance, _)| *distance);

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, position)| Neighbor {
                position,
                distance: distance.0,
            })
            .collect())
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load an index from JSON, re-checking every vector's dimension.
    pub fn from_json(json: &str) -> Result<Self> {
        let index: Self = serde_json::from_str(json)?;
        if let Some(bad) = index.vectors.iter().find(|v| v.len() != index.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: index.dimension,
                actual: bad.len(),
            });
        }
        info!("Loaded {} vectors into L2 index", index.len());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        index
            .add_all(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]])
            .unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let results = sample().search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert_eq!(results[1].distance, 1.0);
        assert_eq!(results[2].distance, 25.0);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_returns_all_when_k_exceeds_len() {
        let results = sample().search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = FlatL2Index::new(1);
        index.add_all(vec![vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let positions: Vec<usize> = index
            .search(&[0.0], 3)
            .unwrap()
            .iter()
            .map(|n| n.position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatL2Index::new(3);
        assert!(index.add(vec![1.0, 0.0]).is_err());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_positions() {
        let restored = FlatL2Index::from_json(&sample().to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.get(1), Some(&vec![3.0, 4.0]));
    }
}
