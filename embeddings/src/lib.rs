//! # Embeddings
//!
//! Text embeddings and exact nearest-neighbour search, the building blocks
//! of the dense retriever.
//!
//! ```text
//! text ──► EmbeddingProvider ──► Embedding ──► FlatL2Index::search ──► Neighbor
//!              ▲
//!      OpenAIProvider, optionally behind CachedProvider
//! ```
//!
//! Search is brute force over squared Euclidean distance: every stored
//! vector is compared with the query. Corpora here are small enough that
//! an approximate index would only add error.

pub mod cache;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::{CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use index::{FlatL2Index, Neighbor};
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider};
pub use similarity::{distance_to_similarity, squared_euclidean};

pub type Embedding = Vec<f32>;

/// Vector length of `text-embedding-3-small`.
pub const DEFAULT_DIMENSION: usize = 1536;
