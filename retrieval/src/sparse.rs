//! Lexical retrieval with TF-IDF weighting.
//!
//! Terms are lowercased alphanumeric runs of at least two characters. Each
//! document vector holds raw term counts times a smoothed inverse document
//! frequency, `ln((1 + n) / (1 + df)) + 1`, and is L2-normalized, so the
//! dot product with a query vector is its cosine similarity.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::error::Result;
use crate::{Retriever, ScoredDocument};

const DEFAULT_K: usize = 4;

/// Term id → weight, sorted by term id.
type SparseVector = Vec<(usize, f32)>;

/// Split text into lowercase terms of two or more characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// TF-IDF index over a fixed corpus.
pub struct SparseRetriever {
    corpus: Arc<Corpus>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    documents: Vec<SparseVector>,
    k: usize,
}

impl SparseRetriever {
    /// Build the index from the whole corpus.
    pub fn new(corpus: Arc<Corpus>) -> Self {
        let tokenized: Vec<Vec<String>> = corpus.iter().map(|d| tokenize(&d.text)).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for terms in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for term in terms {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(term.clone()).or_insert(next_id);
                if id == document_frequency.len() {
                    document_frequency.push(0);
                }
                if !seen.contains(&id) {
                    seen.push(id);
                    document_frequency[id] += 1;
                }
            }
        }

        let n = corpus.len() as f32;
        let idf: Vec<f32> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        let documents = tokenized
            .iter()
            .map(|terms| weigh(terms, &vocabulary, &idf))
            .collect();

        info!(
            "Built TF-IDF index: {} documents, {} terms",
            corpus.len(),
            vocabulary.len()
        );

        Self {
            corpus,
            vocabulary,
            idf,
            documents,
            k: DEFAULT_K,
        }
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

    /// Number of distinct terms in the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Score every document and return the best `k` with a positive score.
    ///
    /// Equal scores keep corpus order.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredDocument> {
        let query_vector: HashMap<usize, f32> =
            weigh(&tokenize(query), &self.vocabulary, &self.idf)
                .into_iter()
                .collect();

        if query_vector.is_empty() {
            debug!("Query has no in-vocabulary terms");
            return Vec::new();
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(position, vector)| {
                let score: f32 = vector
                    .iter()
                    .filter_map(|(term, weight)| query_vector.get(term).map(|q| q * weight))
                    .sum();
                (OrderedFloat(score), position)
            })
            .filter(|(score, _)| score.0 > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .filter_map(|(score, position)| {
                self.corpus.text(position).map(|text| ScoredDocument {
                    position,
                    text: text.to_string(),
                    score: score.0,
                })
            })
            .collect()
    }

    /// Texts of the best `k` matching documents.
    pub fn get_relevant_documents_k(&self, query: &str, k: usize) -> Vec<String> {
        self.search(query, k).into_iter().map(|d| d.text).collect()
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    fn name(&self) -> &str {
        "sparse"
    }

    async fn get_relevant_documents(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.get_relevant_documents_k(query, self.k))
    }
}

/// TF-IDF weights for a bag of terms, L2-normalized. Unknown terms are dropped.
fn weigh(terms: &[String], vocabulary: &HashMap<String, usize>, idf: &[f32]) -> SparseVector {
    let mut counts: HashMap<usize, f32> = HashMap::new();
    for term in terms {
        if let Some(&id) = vocabulary.get(term) {
            *counts.entry(id).or_insert(0.0) += 1.0;
        }
    }

    let mut vector: SparseVector = counts
        .into_iter()
        .map(|(id, count)| (id, count * idf[id]))
        .collect();
    vector.sort_by_key(|(id, _)| *id);

    let norm: f32 = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, weight) in &mut vector {
            *weight /= norm;
        }
    }
    vector
}
