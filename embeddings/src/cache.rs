//! Embedding cache.
//!
//! Building the dense index embeds the whole corpus, which is the same
//! every run. [`CachedProvider`] keeps those vectors, optionally on disk,
//! so restarts only pay for texts it has not seen.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    model: String,
    text: String,
}

impl CacheKey {
    fn new(model: &str, text: &str) -> Self {
        Self {
            model: model.to_string(),
            text: text.to_string(),
        }
    }
}

/// On-disk form of one entry.
#[derive(Serialize, Deserialize)]
struct StoredEmbedding {
    model: String,
    text: String,
    embedding: Embedding,
}

#[derive(Default)]
struct CacheState {
    vectors: HashMap<CacheKey, Embedding>,
    /// Insertion order, oldest first.
    order: VecDeque<CacheKey>,
}

impl CacheState {
    fn insert(&mut self, key: CacheKey, embedding: Embedding, capacity: usize) {
        if self.vectors.insert(key.clone(), embedding).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.vectors.remove(&oldest);
            }
        }
    }
}

/// Bounded (model, text) → vector map; oldest entries are evicted first.
pub struct EmbeddingCache {
    state: RwLock<CacheState>,
    path: Option<PathBuf>,
    capacity: usize,
}

impl EmbeddingCache {
    /// In-memory cache holding at most `capacity` vectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            path: None,
            capacity: capacity.max(1),
        }
    }

    /// Cache persisted as JSON at `path`.
    ///
    /// A missing file starts empty. So does an unreadable one, with a
    /// warning; the next write replaces it.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut cache = Self::new(capacity);

        if fs::try_exists(&path).await? {
            match Self::read_entries(&path).await {
                Ok(entries) => {
                    let state = cache.state.get_mut();
                    for entry in entries {
                        let key = CacheKey {
                            model: entry.model,
                            text: entry.text,
                        };
                        state.insert(key, entry.embedding, cache.capacity);
                    }
                    info!(
                        "Loaded {} cached embeddings from {}",
                        state.vectors.len(),
                        path.display()
                    );
                }
                Err(e) => warn!("Ignoring unreadable embedding cache {}: {e}", path.display()),
            }
        }

        cache.path = Some(path);
        Ok(cache)
    }

    async fn read_entries(path: &Path) -> Result<Vec<StoredEmbedding>> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn get(&self, text: &str, model: &str) -> Option<Embedding> {
        self.state
            .read()
            .await
            .vectors
            .get(&CacheKey::new(model, text))
            .cloned()
    }

    /// Store one vector and persist.
    pub async fn put(&self, text: &str, model: &str, embedding: Embedding) -> Result<()> {
        self.put_many(model, [(text.to_string(), embedding)]).await
    }

    /// Store several vectors for `model` and persist once.
    pub async fn put_many(
        &self,
        model: &str,
        entries: impl IntoIterator<Item = (String, Embedding)>,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            for (text, embedding) in entries {
                state.insert(
                    CacheKey {
                        model: model.to_string(),
                        text,
                    },
                    embedding,
                    self.capacity,
                );
            }
        }
        self.persist().await
    }

    pub async fn contains(&self, text: &str, model: &str) -> bool {
        self.state
            .read()
            .await
            .vectors
            .contains_key(&CacheKey::new(model, text))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.vectors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.vectors.clear();
            state.order.clear();
        }
        self.persist().await
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write via a temp file and rename, so readers never see half a file.
    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = {
            let state = self.state.read().await;
            let entries: Vec<StoredEmbedding> = state
                .order
                .iter()
                .filter_map(|key| {
                    state.vectors.get(key).map(|embedding| StoredEmbedding {
                        model: key.model.clone(),
                        text: key.text.clone(),
                        embedding: embedding.clone(),
                    })
                })
                .collect();
            serde_json::to_string(&entries)?
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        debug!("Persisted embedding cache to {}", path.display());
        Ok(())
    }
}

/// Wraps a provider so repeated texts are served from an [`EmbeddingCache`].
pub struct CachedProvider<P> {
    inner: P,
    cache: EmbeddingCache,
}

impl<P: EmbeddingProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: EmbeddingCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn model_of<'a>(&'a self, request: &'a EmbeddingRequest) -> &'a str {
        request
            .model
            .as_deref()
            .unwrap_or_else(|| self.inner.default_model())
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.inner.default_dimension()
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = self.model_of(&request).to_string();
        if let Some(embedding) = self.cache.get(&request.text, &model).await {
            debug!("Embedding cache hit");
            return Ok(EmbeddingResponse {
                dimension: embedding.len(),
                embedding,
                model,
                tokens_used: None,
            });
        }

        let text = request.text.clone();
        let response = self.inner.embed(request).await?;
        self.cache
            .put(&text, &model, response.embedding.clone())
            .await?;
        Ok(response)
    }

    /// Answers hits from the cache and sends only the misses, as one batch.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let mut slots: Vec<Option<EmbeddingResponse>> = Vec::with_capacity(requests.len());
        let mut misses = Vec::new();
        let mut miss_positions = Vec::new();

        for (position, request) in requests.into_iter().enumerate() {
            let model = self.model_of(&request).to_string();
            match self.cache.get(&request.text, &model).await {
                Some(embedding) => slots.push(Some(EmbeddingResponse {
                    dimension: embedding.len(),
                    embedding,
                    model,
                    tokens_used: None,
                })),
                None => {
                    slots.push(None);
                    miss_positions.push(position);
                    misses.push(request);
                }
            }
        }

        debug!(
            "Embedding batch: {} cached, {} to fetch",
            slots.len() - misses.len(),
            misses.len()
        );

        if !misses.is_empty() {
            let texts: Vec<String> = misses.iter().map(|r| r.text.clone()).collect();
            let model = self.model_of(&misses[0]).to_string();
            let fetched = self.inner.embed_batch(misses).await?;

            self.cache
                .put_many(
                    &model,
                    texts
                        .into_iter()
                        .zip(fetched.iter().map(|r| r.embedding.clone())),
                )
                .await?;

            for (position, response) in miss_positions.into_iter().zip(fetched) {
                slots[position] = Some(response);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Embeds text as `[len]` and records what it was asked for.
    #[derive(Default)]
    struct LengthProvider {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        fn default_model(&self) -> &str {
            "len-1"
        }

        fn default_dimension(&self) -> usize {
            1
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.seen.lock().unwrap().push(request.text.clone());
            Ok(EmbeddingResponse {
                embedding: vec![request.text.len() as f32],
                model: "len-1".to_string(),
                dimension: 1,
                tokens_used: None,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_keyed_by_model_and_text() {
        let cache = EmbeddingCache::new(10);
        cache.put("hello", "m1", vec![1.0, 2.0]).await.unwrap();

        assert_eq!(cache.get("hello", "m1").await, Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("hello", "m2").await, None);
        assert_eq!(cache.get("hell", "m1").await, None);
    }

    #[tokio::test]
    async fn test_evicts_oldest_insert() {
        let cache = EmbeddingCache::new(2);
        cache.put("a", "m", vec![1.0]).await.unwrap();
        cache.put("b", "m", vec![2.0]).await.unwrap();
        cache.put("a", "m", vec![1.5]).await.unwrap();
        cache.put("c", "m", vec![3.0]).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains("a", "m").await);
        assert!(cache.contains("b", "m").await);
        assert!(cache.contains("c", "m").await);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("embeddings.json");

        EmbeddingCache::open(&path, 10)
            .await
            .unwrap()
            .put("hello", "m", vec![0.5])
            .await
            .unwrap();

        let reopened = EmbeddingCache::open(&path, 10).await.unwrap();
        assert_eq!(reopened.get("hello", "m").await, Some(vec![0.5]));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = EmbeddingCache::open(&path, 10).await.unwrap();
        assert!(cache.is_empty().await);

        cache.put("x", "m", vec![1.0]).await.unwrap();
        let reopened = EmbeddingCache::open(&path, 10).await.unwrap();
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeat_embed_is_served_from_cache() {
        let provider = CachedProvider::new(LengthProvider::default(), EmbeddingCache::new(10));

        let first = provider.embed(EmbeddingRequest::new("abc")).await.unwrap();
        let second = provider.embed(EmbeddingRequest::new("abc")).await.unwrap();

        assert_eq!(first.embedding, second.embedding);
        assert_eq!(provider.inner().seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_fetches_only_misses_and_keeps_order() {
        let provider = CachedProvider::new(LengthProvider::default(), EmbeddingCache::new(10));
        provider.embed(EmbeddingRequest::new("bb")).await.unwrap();

        let vectors: Vec<Embedding> = provider
            .embed_batch(vec![
                EmbeddingRequest::new("a"),
                EmbeddingRequest::new("bb"),
                EmbeddingRequest::new("cccc"),
            ])
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.embedding)
            .collect();

        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![4.0]]);
        assert_eq!(
            *provider.inner().seen.lock().unwrap(),
            vec!["bb", "a", "cccc"]
        );
        assert_eq!(provider.cache().len().await, 3);
    }
}
