//! In-memory flat vector index
//!
//! Exhaustive squared-L2 search over L2-normalized embeddings. Entries are
//! published copy-on-write: readers take an `Arc` snapshot and never observe
//! a half-applied upsert.

use super::{Embedder, SemanticIndex};
use crate::error::OrchestrationError;
use crate::models::RetrievalMatch;
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone)]
struct IndexedChunk {
    id: String,
    text: String,
    vector: Vec<f32>,
}

pub struct FlatIndex {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Arc<Vec<IndexedChunk>>>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FlatIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_chunking(embedder, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }

    pub fn with_chunking(embedder: Arc<dyn Embedder>, chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            embedder,
            entries: RwLock::new(Arc::new(Vec::new())),
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    fn snapshot(&self) -> Result<Arc<Vec<IndexedChunk>>> {
        self.entries
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| OrchestrationError::RetrievalError("index lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl SemanticIndex for FlatIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalMatch>> {
        let entries = self.snapshot()?;
        if entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        let mut query = vectors.pop().ok_or_else(|| {
            OrchestrationError::RetrievalError("embedder returned no vector for query".to_string())
        })?;
        normalize(&mut query);

        let mut scored = entries
            .iter()
            .map(|entry| {
                if entry.vector.len() != query.len() {
                    return Err(OrchestrationError::RetrievalError(format!(
                        "dimension mismatch: index {} vs query {}",
                        entry.vector.len(),
                        query.len()
                    )));
                }
                Ok((squared_l2(&entry.vector, &query), entry))
            })
            .collect::<Result<Vec<_>>>()?;

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| RetrievalMatch {
                text: entry.text.clone(),
                distance,
            })
            .collect())
    }

    async fn upsert(&self, documents: &[String]) -> Result<usize> {
        let known: HashSet<String> = self.snapshot()?.iter().map(|e| e.id.clone()).collect();

        let mut seen = HashSet::new();
        let fresh: Vec<(String, String)> = documents
            .iter()
            .flat_map(|doc| split_text(doc, self.chunk_size, self.chunk_overlap))
            .map(|chunk| (content_id(&chunk), chunk))
            .filter(|(id, _)| !known.contains(id) && seen.insert(id.clone()))
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|(_, text)| text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != fresh.len() {
            return Err(OrchestrationError::RetrievalError(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                fresh.len()
            )));
        }

        let mut guard = self
            .entries
            .write()
            .map_err(|_| OrchestrationError::RetrievalError("index lock poisoned".to_string()))?;

        // Another upsert may have landed while we were embedding.
        let present: HashSet<&str> = guard.iter().map(|e| e.id.as_str()).collect();
        let mut next: Vec<IndexedChunk> = (**guard).clone();
        let mut added = 0;
        for ((id, text), mut vector) in fresh.into_iter().zip(vectors) {
            if present.contains(id.as_str()) {
                continue;
            }
            normalize(&mut vector);
            next.push(IndexedChunk { id, text, vector });
            added += 1;
        }
        drop(present);
        *guard = Arc::new(next);

        debug!(added, total = guard.len(), "Index upsert applied");
        Ok(added)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }
}

fn content_id(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Split into windows of at most `chunk_size` characters, consecutive
/// windows sharing `overlap` characters. Blank input yields nothing.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect::<String>());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{HashingEmbedder, SEED_CORPUS};

    fn seeded_index() -> FlatIndex {
        FlatIndex::new(Arc::new(HashingEmbedder::default()))
    }

    fn seed() -> Vec<String> {
        SEED_CORPUS.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_split_text_windows() {
        assert!(split_text("   ", 10, 2).is_empty());
        assert_eq!(split_text("short", 10, 2), vec!["short".to_string()]);

        let chunks = split_text("abcdefghijkl", 5, 2);
        assert_eq!(chunks, vec!["abcde", "defgh", "ghijk", "jkl"]);
    }

    #[tokio::test]
    async fn test_query_ranks_exact_text_first() {
        let index = seeded_index();
        index.upsert(&seed()).await.unwrap();

        let matches = index.query(SEED_CORPUS[7], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, SEED_CORPUS[7]);
        assert!(matches[0].distance < 1e-5);
        assert!(matches[0].distance <= matches[1].distance);
    }

    #[tokio::test]
    async fn test_repeated_upsert_is_idempotent() {
        let index = seeded_index();
        assert_eq!(index.upsert(&seed()).await.unwrap(), SEED_CORPUS.len());
        let before = index.query("diversification risk assets", 1).await.unwrap();

        assert_eq!(index.upsert(&seed()).await.unwrap(), 0);
        assert_eq!(index.len().await.unwrap(), SEED_CORPUS.len());

        let after = index.query("diversification risk assets", 1).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = seeded_index();
        assert!(index.query("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_documents_are_chunked() {
        let index = FlatIndex::with_chunking(Arc::new(HashingEmbedder::default()), 50, 10);
        let long: String = (0..40).map(|i| format!("token{} ", i)).collect();
        let added = index.upsert(&[long]).await.unwrap();
        assert!(added > 1);
    }
}
