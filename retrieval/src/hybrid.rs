//! Hybrid retrieval: sparse and dense hits merged into one list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use tracing::debug;

use chatbot_embeddings::EmbeddingProvider;

use crate::config::{FusionStrategy, RetrievalConfig};
use crate::corpus::Corpus;
use crate::dense::DenseRetriever;
use crate::error::Result;
use crate::sparse::SparseRetriever;
use crate::{Retriever, ScoredDocument};

/// Combines a [`SparseRetriever`] and a [`DenseRetriever`].
///
/// With [`FusionStrategy::Union`] the result is every sparse hit in sparse
/// order followed by the dense hits not already present, compared by text.
/// With [`FusionStrategy::Weighted`] the same candidates are re-ranked by
/// `alpha * sparse_score + (1 - alpha) * dense_score`.
pub struct HybridRetriever {
    sparse: Arc<SparseRetriever>,
    dense: Arc<DenseRetriever>,
    alpha: f32,
    fusion: FusionStrategy,
}

impl HybridRetriever {
    /// Create a union-mode hybrid retriever.
    pub fn new(sparse: Arc<SparseRetriever>, dense: Arc<DenseRetriever>, alpha: f32) -> Self {
        Self {
            sparse,
            dense,
            alpha,
            fusion: FusionStrategy::Union,
        }
    }

    /// Build both sub-retrievers over `corpus` as configured.
    pub async fn from_config(
        corpus: Arc<Corpus>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;

        let sparse = SparseRetriever::new(Arc::clone(&corpus)).with_k(config.sparse_k);
        let dense = DenseRetriever::build_with_model(corpus, provider, config.embedding_model.clone())
            .await?
            .with_k(config.dense_k);

        Ok(Self::new(Arc::new(sparse), Arc::new(dense), config.alpha).with_fusion(config.fusion))
    }

    /// Set the fusion strategy.
    pub fn with_fusion(mut self, fusion: FusionStrategy) -> Self {
        self.fusion = fusion;
        self
    }

    /// The stored blend parameter.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// The active fusion strategy.
    pub fn fusion(&self) -> FusionStrategy {
        self.fusion
    }

    /// Merge sparse and dense hits, each side using its own default k.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        let sparse = self.sparse.search(query, self.sparse.k());
        let dense = self.dense.search(query, self.dense.k()).await?;

        debug!(
            "Hybrid search: {} sparse hits, {} dense hits",
            sparse.len(),
            dense.len()
        );

        Ok(match self.fusion {
            FusionStrategy::Union => union(sparse, dense),
            FusionStrategy::Weighted => weighted(sparse, dense, self.alpha),
        })
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.search(query).await?.into_iter().map(|d| d.text).collect())
    }
}

/// Concatenate, keeping the first occurrence of each text.
fn union(sparse: Vec<ScoredDocument>, dense: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    let mut seen: HashSet<String> = HashSet::new();
    sparse
        .into_iter()
        .chain(dense)
        .filter(|doc| seen.insert(doc.text.clone()))
        .collect()
}

fn weighted(sparse: Vec<ScoredDocument>, dense: Vec<ScoredDocument>, alpha: f32) -> Vec<ScoredDocument> {
    // (document, sparse score, dense score) in first-seen order.
    let mut candidates: Vec<(ScoredDocument, f32, f32)> = Vec::new();

    for doc in sparse {
        let score = doc.score;
        candidates.push((doc, score, 0.0));
    }
    for doc in dense {
        match candidates
            .iter_mut()
            .find(|candidate| candidate.0.text == doc.text)
        {
            Some(candidate) => candidate.2 = candidate.2.max(doc.score),
            None => {
                let score = doc.score;
                candidates.push((doc, 0.0, score));
            }
        }
    }

    let mut fused: Vec<ScoredDocument> = candidates
        .into_iter()
        .map(|(mut doc, s, d)| {
            doc.score = alpha * s + (1.0 - alpha) * d;
            doc
        })
        .collect();

    // Stable: equal scores keep first-seen order.
    fused.sort_by_key(|doc| std::cmp::Reverse(OrderedFloat(doc.score)));
    fused
}
