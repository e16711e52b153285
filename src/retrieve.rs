//! Query-time retrieval: embed the query, scan the index, join hits back to
//! their metadata records.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::SearchHit;
use crate::models::{Chunk, RetrievedChunk};
use crate::store::VectorStore;

/// Retrieval over a loaded store.
///
/// Results follow the index's own relevance ordering for its metric; the
/// retriever never re-sorts.
pub struct Retriever {
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(store: VectorStore, embedder: Box<dyn Embedder>, default_top_k: usize) -> Self {
        Self {
            store,
            embedder,
            default_top_k,
        }
    }

    /// Open the production retriever. The store is loaded and validated
    /// before the API client is constructed, so filesystem problems are
    /// reported even when no credential is present.
    pub fn open(config: &Config) -> Result<Self> {
        let store = VectorStore::load(&config.paths.index, &config.paths.metadata)?;
        store.verify_model(&config.openai.embedding_model)?;
        let embedder = Box::new(OpenAiEmbedder::new(&config.openai)?);
        Ok(Self::new(store, embedder, config.rag.top_k))
    }

    /// Retrieve the most relevant chunks for a query. `top_k` falls back to
    /// the configured default.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        let k = top_k.unwrap_or(self.default_top_k);
        let query_vec = self
            .embedder
            .embed_query(query)
            .await
            .context("Failed to embed query")?;
        let hits = self.store.index().search(&query_vec, k)?;
        Ok(join_hits(&hits, self.store.chunks()))
    }
}

/// Pair index hits with their metadata records, preserving hit order.
/// Positions outside the chunk list are skipped silently; a divergent store
/// must degrade retrieval, never crash it.
fn join_hits(hits: &[SearchHit], chunks: &[Chunk]) -> Vec<RetrievedChunk> {
    hits.iter()
        .filter(|hit| hit.position < chunks.len())
        .map(|hit| {
            let meta = &chunks[hit.position];
            RetrievedChunk {
                content: meta.content.clone(),
                source: meta.source.clone(),
                chunk_id: meta.chunk_id,
                score: hit.score,
            }
        })
        .collect()
}

/// One-shot retrieval command: print the top chunks for a query without
/// calling the chat model. Hits use the same provenance line the shell's
/// debug mode prints, followed by the chunk text.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let retriever = Retriever::open(config)?;
    let results = retriever.retrieve(query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &results {
        println!("- {} (chunk {}, score={:.4})", hit.source, hit.chunk_id, hit.score);
        for line in hit.content.lines() {
            println!("  {}", line);
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FlatIndex, Metric};
    use anyhow::Result;
    use async_trait::async_trait;

    fn chunk(id: usize, content: &str) -> Chunk {
        Chunk {
            source: "docs/guide.md".to_string(),
            chunk_id: id,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_join_pairs_hits_with_records() {
        let chunks = vec![chunk(0, "first"), chunk(1, "second")];
        let hits = vec![
            SearchHit {
                position: 1,
                score: 0.25,
            },
            SearchHit {
                position: 0,
                score: 0.75,
            },
        ];

        let joined = join_hits(&hits, &chunks);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].content, "second");
        assert_eq!(joined[0].score, 0.25);
        assert_eq!(joined[1].chunk_id, 0);
    }

    #[test]
    fn test_join_skips_out_of_range_positions() {
        let chunks = vec![chunk(0, "only")];
        let hits = vec![
            SearchHit {
                position: 7,
                score: 0.1,
            },
            SearchHit {
                position: 0,
                score: 0.9,
            },
        ];

        let joined = join_hits(&hits, &chunks);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].content, "only");
    }

    struct ConstEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for ConstEmbedder {
        fn model(&self) -> &str {
            "stub"
        }

        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    #[tokio::test]
    async fn test_retrieve_uses_default_top_k_and_index_order() {
        let mut index = FlatIndex::new(Metric::L2, 2).unwrap();
        index.push(&[1.0, 0.0]).unwrap();
        index.push(&[0.0, 1.0]).unwrap();
        let chunks = vec![chunk(0, "about hydration"), chunk(1, "about chest pain")];
        let store = VectorStore::build(index, chunks, "stub").unwrap();

        let embedder = Box::new(ConstEmbedder {
            vector: vec![0.1, 0.9],
        });
        let retriever = Retriever::new(store, embedder, 1);

        let results = retriever.retrieve("anything", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, 1);
        assert_eq!(results[0].content, "about chest pain");
    }
}
