//! # Retrieval
//!
//! Document retrieval over a fixed, in-memory corpus:
//!
//! - **Sparse**: TF-IDF lexical matching
//! - **Dense**: nearest neighbours over embeddings from an external provider
//! - **Hybrid**: both of the above merged into one de-duplicated list
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Corpus                                  │
//! │                 ┌─────────┴─────────┐                           │
//! │                 ▼                   ▼                           │
//! │        SparseRetriever       DenseRetriever ◄── EmbeddingProvider│
//! │                 └─────────┬─────────┘                           │
//! │                           ▼                                     │
//! │                   HybridRetriever ──► Vec<String>               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let corpus = Arc::new(Corpus::nestle_sample());
//! let hybrid = HybridRetriever::from_config(corpus, provider, &RetrievalConfig::default()).await?;
//! let context = hybrid.get_relevant_documents("Is Nestle ISO certified?").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod corpus;
pub mod dense;
pub mod error;
pub mod hybrid;
pub mod sparse;

pub use config::{FusionStrategy, RetrievalConfig};
pub use corpus::{Corpus, Document};
pub use dense::{DenseHit, DenseRetriever};
pub use error::{Result, RetrievalError};
pub use hybrid::HybridRetriever;
pub use sparse::SparseRetriever;

/// A retrieved document with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Position of the document in the corpus.
    pub position: usize,

    /// Document text.
    pub text: String,

    /// Relevance score (higher is better).
    pub score: f32,
}

/// Anything that turns a query into an ordered list of document texts.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Relevant document texts for `query`, best first.
    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<String>>;
}
