//! Embedding client abstraction and the OpenAI implementation.
//!
//! [`Embedder`] is the seam between the pipeline and the embedding backend:
//! the build and query paths depend only on the trait, and tests substitute
//! a deterministic implementation. [`OpenAiEmbedder`] is the production
//! backend, calling the OpenAI embeddings API in fixed-size batches through
//! the shared retry/timeout plumbing in [`crate::openai`].
//!
//! Two response properties are enforced on every batch: the vector count
//! must equal the input count, and the dimension must stay uniform across
//! the whole corpus. A model that changes dimension mid-build would
//! otherwise corrupt the index silently.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::OpenAiConfig;
use crate::openai::ApiClient;

/// Interface to an embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded in the store (e.g. `"text-embedding-3-small"`).
    fn model(&self) -> &str;

    /// Embed a batch of texts: one vector per input, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => bail!("Expected exactly one embedding for the query"),
        }
    }
}

/// Embedding backend using the OpenAI API.
///
/// Partitions input into `batch_size` batches (default 64) and issues one
/// request per batch. Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    api: ApiClient,
    model: String,
    batch_size: usize,
    progress: bool,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size,
            progress: false,
        })
    }

    /// Enable the in-place stderr progress line during batch embedding.
    /// Callers turn this on only when stderr is a terminal.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let mut dims: Option<usize> = None;

        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });

            let json = self
                .api
                .post_json("embeddings", &body)
                .await
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            let batch_vectors = parse_embeddings_response(&json)?;

            if batch_vectors.len() != batch.len() {
                bail!(
                    "Embeddings response returned {} vectors for {} inputs",
                    batch_vectors.len(),
                    batch.len()
                );
            }

            for vector in batch_vectors {
                if vector.is_empty() {
                    bail!("Embeddings response contained an empty vector");
                }
                match dims {
                    None => dims = Some(vector.len()),
                    Some(d) if d != vector.len() => bail!(
                        "Embedding dimension changed mid-corpus: {} then {}",
                        d,
                        vector.len()
                    ),
                    Some(_) => {}
                }
                vectors.push(vector);
            }

            if self.progress {
                eprint!("\rEmbedding chunks: {}/{}", vectors.len(), texts.len());
            }
        }

        if self.progress {
            eprintln!();
        }

        Ok(vectors)
    }
}

/// Parse the embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays and returns them in response
/// order, which the API guarantees matches input order.
pub fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing embedding"))?;

        let vector: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vector);
    }

    Ok(embeddings)
}
