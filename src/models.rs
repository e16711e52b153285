//! Core data models used throughout careline.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the build and query pipelines.

use serde::{Deserialize, Serialize};

/// A source document read from disk, before chunking.
///
/// Ephemeral: read fresh on every build, discarded after chunking.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: String,
    pub content: String,
}

/// A bounded window of a source document, the unit of embedding and retrieval.
///
/// `chunk_id` is a dense, zero-based sequence number within one source
/// document, assigned in slicing order. Field names are part of the metadata
/// file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub chunk_id: usize,
    pub content: String,
}

/// An index hit joined with its metadata record.
///
/// `score` is the raw metric value from the index: a squared Euclidean
/// distance (smaller is better) or an inner product (larger is better),
/// depending on the metric the index was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub chunk_id: usize,
    pub score: f32,
}
