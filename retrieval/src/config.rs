//! Configuration for the hybrid retriever.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// How the hybrid retriever merges sparse and dense hits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Sparse hits first, then unseen dense hits. `alpha` is not applied.
    #[default]
    Union,
    /// Re-rank the union by `alpha * sparse + (1 - alpha) * dense`.
    Weighted,
}

/// Configuration for sparse, dense and hybrid retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of documents the sparse retriever returns.
    pub sparse_k: usize,

    /// Number of documents the dense retriever returns.
    pub dense_k: usize,

    /// Blend between sparse (1.0) and dense (0.0) scores.
    pub alpha: f32,

    /// How sparse and dense hits are merged.
    pub fusion: FusionStrategy,

    /// Embedding model override; the provider default when unset.
    pub embedding_model: Option<String>,
}

impl RetrievalConfig {
    /// Set both per-retriever result counts.
    pub fn with_k(mut self, sparse_k: usize, dense_k: usize) -> Self {
        self.sparse_k = sparse_k;
        self.dense_k = dense_k;
        self
    }

    /// Set the blend parameter.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the fusion strategy.
    pub fn with_fusion(mut self, fusion: FusionStrategy) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(RetrievalError::Config(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            sparse_k: 4,
            dense_k: 4,
            alpha: 0.5,
            fusion: FusionStrategy::Union,
            embedding_model: None,
        }
    }
}
