//! Document ingestion and index construction.
//!
//! Only simple text formats are ingested in this iteration. Keeping the
//! allow-list small makes ingestion predictable and easy to extend later
//! (adding PDF support would slot in here).

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use walkdir::WalkDir;

use crate::chunk::ChunkPolicy;
use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::FlatIndex;
use crate::models::{Chunk, RawDocument};
use crate::store::VectorStore;

/// File extensions treated as ingestible documents (matched case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Load every supported document under `documents_dir`, recursively.
///
/// File bytes are decoded lossily so a stray invalid sequence cannot abort a
/// whole build. Documents are returned sorted by source path; empty files are
/// kept here and dropped later by chunking.
pub fn load_raw_documents(documents_dir: &Path) -> Result<Vec<RawDocument>> {
    if !documents_dir.is_dir() {
        bail!(
            "Documents directory not found: {}",
            documents_dir.display()
        );
    }

    let mut docs = Vec::new();
    for entry in WalkDir::new(documents_dir) {
        let entry = entry.context("Failed to walk documents directory")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            continue;
        }

        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read document {}", path.display()))?;
        docs.push(RawDocument {
            source: path.display().to_string(),
            content: String::from_utf8_lossy(&bytes).trim().to_string(),
        });
    }

    // Sort for deterministic ordering
    docs.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(docs)
}

/// Cut documents into chunks, numbering chunks from zero within each source.
pub fn chunk_documents(docs: &[RawDocument], policy: ChunkPolicy) -> Vec<Chunk> {
    let mut all_chunks = Vec::new();
    for doc in docs {
        for (idx, content) in policy.split(&doc.content).into_iter().enumerate() {
            all_chunks.push(Chunk {
                source: doc.source.clone(),
                chunk_id: idx,
                content,
            });
        }
    }
    all_chunks
}

/// Load and chunk documents according to configuration.
pub fn ingest_documents(config: &Config) -> Result<Vec<Chunk>> {
    let docs = load_raw_documents(&config.paths.documents)?;
    let policy = ChunkPolicy::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    Ok(chunk_documents(&docs, policy))
}

/// Build the index: ingest, embed, persist.
///
/// Ingestion problems (missing directory, empty corpus) are reported before
/// any API client is constructed, so `--dry-run` and data errors never
/// require a credential.
pub async fn run_build(config: &Config, dry_run: bool) -> Result<()> {
    let docs = load_raw_documents(&config.paths.documents)?;
    let policy = ChunkPolicy::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let chunks = chunk_documents(&docs, policy);

    println!(
        "Ingested {} chunks from {} documents in {}",
        chunks.len(),
        docs.len(),
        config.paths.documents.display()
    );

    if chunks.is_empty() {
        bail!("No text chunks found. Ensure documents are available in the configured directory.");
    }

    if dry_run {
        for (source, count) in per_source_counts(&chunks) {
            println!("{:>6}  {}", count, source);
        }
        println!("Dry run complete. No embeddings were generated; nothing was written.");
        return Ok(());
    }

    let embedder =
        OpenAiEmbedder::new(&config.openai)?.with_progress(atty::is(atty::Stream::Stderr));

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_texts(&texts).await?;

    let dims = vectors
        .first()
        .map(|v| v.len())
        .ok_or_else(|| anyhow!("Embedding backend returned no vectors"))?;
    let mut index = FlatIndex::new(config.rag.metric, dims)?;
    for vector in &vectors {
        index.push(vector)?;
    }

    let store = VectorStore::build(index, chunks, &config.openai.embedding_model)?;
    store.save(&config.paths.index, &config.paths.metadata)?;

    println!("Built flat index with {} vectors.", store.len());
    println!("Index saved to: {}", config.paths.index.display());
    println!("Metadata saved to: {}", config.paths.metadata.display());

    Ok(())
}

/// Chunk counts per source, in source order.
fn per_source_counts(chunks: &[Chunk]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for chunk in chunks {
        match counts.last_mut() {
            Some((source, count)) if *source == chunk.source => *count += 1,
            _ => counts.push((chunk.source.clone(), 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_raw_documents_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "second document").unwrap();
        fs::write(dir.path().join("a.txt"), "first document").unwrap();
        fs::write(dir.path().join("c.pdf"), "binary-ish").unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.TXT"), "nested document").unwrap();

        let docs = load_raw_documents(dir.path()).unwrap();
        let names: Vec<&str> = docs
            .iter()
            .map(|d| d.source.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.md", "d.TXT"]);
        assert_eq!(docs[0].content, "first document");
    }

    #[test]
    fn test_load_raw_documents_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");

        let err = load_raw_documents(&missing).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Documents directory not found"));
        assert!(msg.contains("no-such-dir"));
    }

    #[test]
    fn test_empty_file_kept_but_yields_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n  ").unwrap();

        let docs = load_raw_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "");

        let policy = ChunkPolicy::new(100, 10).unwrap();
        assert!(chunk_documents(&docs, policy).is_empty());
    }

    #[test]
    fn test_chunk_ids_restart_per_document() {
        let docs = vec![
            RawDocument {
                source: "a.txt".to_string(),
                content: "x".repeat(25),
            },
            RawDocument {
                source: "b.txt".to_string(),
                content: "y".repeat(8),
            },
        ];

        let policy = ChunkPolicy::new(10, 2).unwrap();
        let chunks = chunk_documents(&docs, policy);

        let a_ids: Vec<usize> = chunks
            .iter()
            .filter(|c| c.source == "a.txt")
            .map(|c| c.chunk_id)
            .collect();
        let b_ids: Vec<usize> = chunks
            .iter()
            .filter(|c| c.source == "b.txt")
            .map(|c| c.chunk_id)
            .collect();
        assert_eq!(a_ids, vec![0, 1, 2]);
        assert_eq!(b_ids, vec![0]);
    }

    #[test]
    fn test_per_source_counts_preserves_order() {
        let chunks = vec![
            Chunk {
                source: "a.txt".to_string(),
                chunk_id: 0,
                content: "one".to_string(),
            },
            Chunk {
                source: "a.txt".to_string(),
                chunk_id: 1,
                content: "two".to_string(),
            },
            Chunk {
                source: "b.txt".to_string(),
                chunk_id: 0,
                content: "three".to_string(),
            },
        ];

        assert_eq!(
            per_source_counts(&chunks),
            vec![("a.txt".to_string(), 2), ("b.txt".to_string(), 1)]
        );
    }
}
