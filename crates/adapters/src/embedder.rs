//! Embedder (§4.2): the external embedding-computation collaborator the
//! Ranker uses for its semantic-similarity term. Out of scope per the spec;
//! this module defines only the interface and a production HTTP client.

use crate::error::EmbedderError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: base_url.into() }
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let resp = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedderError::Timeout
                } else {
                    EmbedderError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            tracing::warn!(%status, "embedder request failed");
            return Err(EmbedderError::Request(format!("status {status}")));
        }

        resp.json::<EmbedResponse>()
            .await
            .map(|r| r.embedding)
            .map_err(|e| EmbedderError::Request(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    /// A deterministic bag-of-words embedder for tests: each dimension is a
    /// hashed token bucket count, so cosine similarity tracks shared
    /// vocabulary without calling out to a real model.
    pub struct FakeEmbedder {
        dims: usize,
    }

    impl FakeEmbedder {
        pub fn new() -> Self {
            Self { dims: 64 }
        }
    }

    impl Default for FakeEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
            let mut vector = vec![0f32; self.dims];
            for token in text.split_whitespace() {
                let token = token.to_lowercase();
                let bucket = token
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
                    as usize
                    % self.dims;
                vector[bucket] += 1.0;
            }
            Ok(vector)
        }
    }
}

/// Cosine similarity rescaled to `[0, 100]`. Used by the Ranker; lives here
/// because it's purely a property of the embedding space the Embedder
/// produces.
pub fn cosine_similarity_0_100(a: &[f32], b: &[f32]) -> u8 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0;
    }
    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (((cosine + 1.0) / 2.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::fake::FakeEmbedder;
    use super::*;

    #[tokio::test]
    async fn fake_embedder_is_deterministic() {
        let embedder = FakeEmbedder::new();
        let a = embedder.embed("built X in Go").await.unwrap();
        let b = embedder.embed("built X in Go").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn similar_text_scores_higher_than_unrelated_text() {
        let embedder = FakeEmbedder::new();
        let profile = embedder.embed("Go engineer backend systems").await.unwrap();
        let similar = embedder.embed("Go backend engineer needed").await.unwrap();
        let unrelated = embedder.embed("marketing copywriter brand voice").await.unwrap();
        let close = cosine_similarity_0_100(&profile, &similar);
        let far = cosine_similarity_0_100(&profile, &unrelated);
        assert!(close > far, "close={close} far={far}");
    }

    #[test]
    fn identical_vectors_score_100() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity_0_100(&v, &v), 100);
    }

    #[test]
    fn empty_vector_scores_zero() {
        assert_eq!(cosine_similarity_0_100(&[], &[1.0]), 0);
    }
}
