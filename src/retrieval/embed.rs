//! Offline embedder
//!
//! Feature hashing over lower-cased word tokens. Deterministic and free of
//! network calls; used when no embedding service is configured.

use super::Embedder;
use crate::Result;
use sha2::{Digest, Sha256};

pub const DEFAULT_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait::async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed_one("Diversification reduces risk"),
            embedder.embed_one("diversification, reduces RISK!")
        );
    }

    #[test]
    fn test_dimensions() {
        let embedder = HashingEmbedder::new(16);
        assert_eq!(embedder.embed_one("anything at all").len(), 16);
        assert!(HashingEmbedder::new(4).embed_one("").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_batch_embed_preserves_order() {
        let embedder = HashingEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = tokio_test::block_on(embedder.embed(&texts)).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed_one("alpha"));
        assert_eq!(vectors[1], embedder.embed_one("beta"));
    }
}
