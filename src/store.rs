//! Paired persistence of the vector index and its chunk metadata.
//!
//! A build produces exactly two artifacts: the binary index file and a JSON
//! metadata file whose `chunks` array is positionally aligned with the index
//! (chunk `i` describes vector `i`). Both artifacts record the same build
//! fingerprint, a SHA-256 over the embedding model, metric, vector payload,
//! and chunk records. [`VectorStore::load`] recomputes the fingerprint and
//! refuses to serve a pair whose halves come from different builds, so a
//! partial rebuild or a crash between the two commits surfaces as an error
//! instead of silently misattributed text.
//!
//! Writes go to a temporary sibling file first and are renamed into place,
//! so a crash mid-write never leaves a half-written artifact at the final
//! path.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::index::{FlatIndex, Metric};
use crate::models::Chunk;

const STORE_VERSION: u32 = 1;

/// On-disk metadata envelope. `chunks[i]` describes index position `i`.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    version: u32,
    embedding_model: String,
    metric: Metric,
    dims: usize,
    count: usize,
    built_at: DateTime<Utc>,
    fingerprint: String,
    chunks: Vec<Chunk>,
}

/// A loaded (or freshly built) index/metadata pair.
#[derive(Debug)]
pub struct VectorStore {
    index: FlatIndex,
    chunks: Vec<Chunk>,
    embedding_model: String,
    built_at: DateTime<Utc>,
    fingerprint: [u8; 32],
}

impl VectorStore {
    /// Assemble a store from a populated index and its aligned chunk list.
    pub fn build(index: FlatIndex, chunks: Vec<Chunk>, embedding_model: &str) -> Result<Self> {
        if index.len() != chunks.len() {
            bail!(
                "index has {} vectors but {} chunks were provided",
                index.len(),
                chunks.len()
            );
        }
        let fingerprint = compute_fingerprint(embedding_model, &index, &chunks);
        Ok(Self {
            index,
            chunks,
            embedding_model: embedding_model.to_string(),
            built_at: Utc::now(),
            fingerprint,
        })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Write both artifacts, creating parent directories as needed. Each file
    /// is written to a `.tmp` sibling and renamed into place.
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<()> {
        write_atomic(index_path, &self.index.to_bytes(&self.fingerprint))?;

        let metadata = MetadataFile {
            version: STORE_VERSION,
            embedding_model: self.embedding_model.clone(),
            metric: self.index.metric(),
            dims: self.index.dims(),
            count: self.chunks.len(),
            built_at: self.built_at,
            fingerprint: fingerprint_hex(&self.fingerprint),
            chunks: self.chunks.clone(),
        };
        let json =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
        write_atomic(metadata_path, json.as_bytes())?;

        Ok(())
    }

    /// Load and cross-validate both artifacts.
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self> {
        if !index_path.exists() {
            bail!(
                "Vector index not found at {}. Run `careline build` first.",
                index_path.display()
            );
        }
        if !metadata_path.exists() {
            bail!(
                "Metadata file not found at {}. Run `careline build` first.",
                metadata_path.display()
            );
        }

        let index_bytes = std::fs::read(index_path)
            .with_context(|| format!("Failed to read index file: {}", index_path.display()))?;
        let (index, index_fp) = FlatIndex::from_bytes(&index_bytes)
            .with_context(|| format!("Failed to decode index file: {}", index_path.display()))?;

        let metadata_text = std::fs::read_to_string(metadata_path).with_context(|| {
            format!("Failed to read metadata file: {}", metadata_path.display())
        })?;
        let metadata: MetadataFile = serde_json::from_str(&metadata_text).with_context(|| {
            format!("Failed to parse metadata file: {}", metadata_path.display())
        })?;

        if metadata.version != STORE_VERSION {
            bail!("Unsupported metadata version {}", metadata.version);
        }
        if metadata.count != metadata.chunks.len() {
            bail!(
                "Metadata file corrupt: header says {} chunks, found {}",
                metadata.count,
                metadata.chunks.len()
            );
        }
        if index.len() != metadata.chunks.len() {
            bail!(
                "Index/metadata mismatch: {} vectors vs {} chunks. Rebuild with `careline build`.",
                index.len(),
                metadata.chunks.len()
            );
        }
        if index.dims() != metadata.dims {
            bail!(
                "Index/metadata mismatch: index dimension {} vs recorded {}. Rebuild with `careline build`.",
                index.dims(),
                metadata.dims
            );
        }
        if index.metric() != metadata.metric {
            bail!(
                "Index/metadata mismatch: index metric '{}' vs recorded '{}'. Rebuild with `careline build`.",
                index.metric().as_str(),
                metadata.metric.as_str()
            );
        }

        let computed = compute_fingerprint(&metadata.embedding_model, &index, &metadata.chunks);
        if computed != index_fp || fingerprint_hex(&computed) != metadata.fingerprint {
            bail!(
                "Index and metadata do not belong to the same build (fingerprint mismatch). Rebuild with `careline build`."
            );
        }

        Ok(Self {
            index,
            chunks: metadata.chunks,
            embedding_model: metadata.embedding_model,
            built_at: metadata.built_at,
            fingerprint: computed,
        })
    }

    /// Refuse to serve queries embedded with a different model than the one
    /// the index was built with.
    pub fn verify_model(&self, expected: &str) -> Result<()> {
        if self.embedding_model != expected {
            bail!(
                "Index was built with embedding model '{}' but the configuration says '{}'. Rebuild with `careline build`.",
                self.embedding_model,
                expected
            );
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, bytes)
        .with_context(|| format!("Failed to write temporary file: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to commit {} (atomic rename)", path.display()))?;

    Ok(())
}

fn compute_fingerprint(embedding_model: &str, index: &FlatIndex, chunks: &[Chunk]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(embedding_model.as_bytes());
    hasher.update([0u8]);
    hasher.update(index.metric().as_str().as_bytes());
    hasher.update((index.dims() as u64).to_le_bytes());
    hasher.update((index.len() as u64).to_le_bytes());
    for position in 0..index.len() {
        for &value in index.vector(position) {
            hasher.update(value.to_le_bytes());
        }
    }
    for chunk in chunks {
        hasher.update(chunk.source.as_bytes());
        hasher.update([0u8]);
        hasher.update((chunk.chunk_id as u64).to_le_bytes());
        hasher.update(chunk.content.as_bytes());
        hasher.update([0u8]);
    }

    let digest = hasher.finalize();
    let mut fingerprint = [0u8; 32];
    fingerprint.copy_from_slice(&digest);
    fingerprint
}

fn fingerprint_hex(fingerprint: &[u8; 32]) -> String {
    fingerprint.iter().map(|b| format!("{:02x}", b)).collect()
}
