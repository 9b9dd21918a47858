//! Local embedding backend: deterministic feature hashing.
//!
//! Each whitespace token is hashed into one of `dimension` buckets with a
//! hash-derived sign, then the vector is L2-normalized. No model assets, no
//! I/O; the same text always yields the same vector, which is what the
//! integration tests and air-gapped deployments rely on.

use async_trait::async_trait;

use fxhash::hash64;

use crate::embed::normalize::l2_normalize_in_place;
use crate::embed::EmbeddingProvider;
use crate::error::PipelineError;

pub struct LocalEmbedder {
    dimension: u64,
}

impl LocalEmbedder {
    pub fn new(dimension: u64) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn dimension(&self) -> u64 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "embedding input is empty or whitespace-only".into(),
            ));
        }

        let mut v = vec![0f32; self.dimension as usize];
        for token in text.split_whitespace() {
            let h = hash64(token.to_lowercase().as_bytes());
            let bucket = (h % self.dimension) as usize;
            let sign = if (h >> 63) & 1 == 1 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize_in_place(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vector_has_declared_dimension() {
        let embedder = LocalEmbedder::new(384);
        let v = embedder.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 384);
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn same_text_same_vector() {
        let embedder = LocalEmbedder::new(64);
        let a = embedder.embed("venture capital firms").await.unwrap();
        let b = embedder.embed("venture capital firms").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_different_vector() {
        let embedder = LocalEmbedder::new(64);
        let a = embedder.embed("alpha").await.unwrap();
        let b = embedder.embed("omega").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn output_is_unit_length() {
        let embedder = LocalEmbedder::new(128);
        let v = embedder.embed("a b c d e f").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_and_whitespace_inputs_are_rejected() {
        let embedder = LocalEmbedder::new(64);
        for input in ["", "   ", "\n\t "] {
            let err = embedder.embed(input).await.unwrap_err();
            assert!(matches!(err, PipelineError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn case_does_not_change_tokens() {
        let embedder = LocalEmbedder::new(64);
        let a = embedder.embed("Hello World").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }
}
