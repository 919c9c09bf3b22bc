//! Embedding-based retrieval over an exact L2 index.

use std::sync::Arc;

use async_trait::async_trait;
use chatbot_embeddings::similarity::distance_to_similarity;
use chatbot_embeddings::{EmbeddingProvider, EmbeddingRequest, FlatL2Index};
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::error::{Result, RetrievalError};
use crate::{Retriever, ScoredDocument};

const DEFAULT_K: usize = 4;

/// A dense hit with its raw squared L2 distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseHit {
    /// Position of the document in the corpus.
    pub position: usize,

    /// Document text.
    pub text: String,

    /// Squared Euclidean distance between query and document embeddings.
    pub distance: f32,
}

/// Nearest-neighbour retriever over corpus embeddings.
///
/// The corpus is embedded once at build time; every query costs one
/// embedding call. Provider failures are returned to the caller as-is.
pub struct DenseRetriever {
    corpus: Arc<Corpus>,
    provider: Arc<dyn EmbeddingProvider>,
    index: FlatL2Index,
    model: Option<String>,
    k: usize,
}

impl DenseRetriever {
    /// Embed every document and build the index.
    pub async fn build(corpus: Arc<Corpus>, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::build_with_model(corpus, provider, None).await
    }

    /// Like [`DenseRetriever::build`], with an explicit embedding model.
    pub async fn build_with_model(
        corpus: Arc<Corpus>,
        provider: Arc<dyn EmbeddingProvider>,
        model: Option<String>,
    ) -> Result<Self> {
        let requests: Vec<EmbeddingRequest> = corpus
            .iter()
            .map(|d| request(&d.text, model.as_deref()))
            .collect();

        let responses = if requests.is_empty() {
            Vec::new()
        } else {
            provider.embed_batch(requests).await?
        };

        if responses.len() != corpus.len() {
            return Err(RetrievalError::EmbeddingCount {
                expected: corpus.len(),
                actual: responses.len(),
            });
        }

        let dimension = responses
            .first()
            .map_or_else(|| provider.default_dimension(), |r| r.embedding.len());
        let mut index = FlatL2Index::new(dimension);
        index.add_all(responses.into_iter().map(|r| r.embedding))?;

        info!(
            "Built dense index with {} ({}): {} documents, dimension {dimension}",
            provider.name(),
            model.as_deref().unwrap_or(provider.default_model()),
            index.len()
        );

        Ok(Self {
            corpus,
            provider,
            index,
            model,
            k: DEFAULT_K,
        })
    }

    /// Set the default number of results.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Default number of results.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The `k` nearest documents in ascending distance order.
    pub async fn nearest(&self, query: &str, k: usize) -> Result<Vec<DenseHit>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .provider
            .embed(request(query, self.model.as_deref()))
            .await?
            .embedding;

        let neighbors = self.index.search(&embedding, k)?;
        debug!("Dense search returned {} neighbours", neighbors.len());

        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                self.corpus.text(n.position).map(|text| DenseHit {
                    position: n.position,
                    text: text.to_string(),
                    distance: n.distance,
                })
            })
            .collect())
    }

    /// Nearest documents scored by `1 / (1 + distance)`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        Ok(self
            .nearest(query, k)
            .await?
            .into_iter()
            .map(|hit| ScoredDocument {
                position: hit.position,
                text: hit.text,
                score: distance_to_similarity(hit.distance),
            })
            .collect())
    }

    /// Texts of the `k` nearest documents.
    pub async fn get_relevant_documents_k(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .nearest(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> &str {
        "dense"
    }

    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<String>> {
        self.get_relevant_documents_k(query, self.k).await
    }
}

fn request(text: &str, model: Option<&str>) -> EmbeddingRequest {
    let request = EmbeddingRequest::new(text);
    match model {
        Some(model) => request.with_model(model),
        None => request,
    }
}
