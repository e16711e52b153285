//! Flat (exhaustive-scan) vector index.
//!
//! Stores embedding vectors as one dense little-endian f32 sequence and
//! answers k-nearest-neighbor queries by scoring the query against every
//! stored vector. Position `i` in the index corresponds to position `i` in
//! the metadata chunk list; the persisted file carries the build fingerprint
//! so that pairing is checked when the store is loaded.
//!
//! # File format
//!
//! ```text
//! offset  size  field
//! 0       4     magic "CLIX"
//! 4       2     format version (u16 LE)
//! 6       1     metric (0 = l2, 1 = ip)
//! 7       1     reserved (0)
//! 8       4     dims (u32 LE)
//! 12      4     vector count (u32 LE)
//! 16      32    build fingerprint (raw SHA-256)
//! 48      ...   count × dims f32 values, little-endian
//! ```

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MAGIC: [u8; 4] = *b"CLIX";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 48;

/// Similarity metric an index is built with.
///
/// - `L2`: squared Euclidean distance, smaller is better. No square root is
///   taken; rankings are unaffected and raw scores match the usual flat-L2
///   index convention.
/// - `Ip`: raw inner product, larger is better. Vectors are not normalized,
///   so this is a dot product, not cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    L2,
    Ip,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::L2 => "l2",
            Metric::Ip => "ip",
        }
    }

    fn code(self) -> u8 {
        match self {
            Metric::L2 => 0,
            Metric::Ip => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Metric::L2),
            1 => Ok(Metric::Ip),
            other => bail!("unknown metric code {} in index file", other),
        }
    }

    /// Score a stored vector against a query. Both slices must have the same
    /// length; the index enforces this before calling.
    pub fn score(self, stored: &[f32], query: &[f32]) -> f32 {
        match self {
            Metric::L2 => l2_distance(stored, query),
            Metric::Ip => inner_product(stored, query),
        }
    }

    /// Ordering that ranks better scores first for this metric.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Metric::L2 => ord,
            Metric::Ip => ord.reverse(),
        }
    }
}

/// One search result: a position into the index and its raw score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub score: f32,
}

/// Dense in-memory vector index with exhaustive search.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(metric: Metric, dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("index dimension must be > 0");
        }
        Ok(Self {
            metric,
            dims,
            data: Vec::new(),
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stored vector at `position`. Panics if out of range.
    pub fn vector(&self, position: usize) -> &[f32] {
        &self.data[position * self.dims..(position + 1) * self.dims]
    }

    /// Append a vector. Insertion order defines index positions.
    pub fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dims {
            bail!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dims
            );
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Score the query against every stored vector and return up to `k` hits,
    /// best first (ascending distance for l2, descending product for ip),
    /// ties broken by position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dims {
            bail!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dims
            );
        }

        let mut hits: Vec<SearchHit> = (0..self.len())
            .map(|position| SearchHit {
                position,
                score: self.metric.score(self.vector(position), query),
            })
            .collect();

        hits.sort_by(|a, b| {
            self.metric
                .compare(a.score, b.score)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Serialize to the on-disk format, embedding the build fingerprint in
    /// the header.
    pub fn to_bytes(&self, fingerprint: &[u8; 32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.push(self.metric.code());
        bytes.push(0);
        bytes.extend_from_slice(&(self.dims as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(fingerprint);
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Deserialize from the on-disk format, returning the index and the
    /// fingerprint recorded in its header.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, [u8; 32])> {
        if bytes.len() < HEADER_LEN {
            bail!("index file truncated: {} bytes", bytes.len());
        }
        if bytes[0..4] != MAGIC {
            bail!("not a careline index file (bad magic)");
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            bail!("unsupported index file version {}", version);
        }

        let metric = Metric::from_code(bytes[6])?;
        let dims = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        if dims == 0 {
            bail!("index file corrupt: zero dimension");
        }

        let mut fingerprint = [0u8; 32];
        fingerprint.copy_from_slice(&bytes[16..HEADER_LEN]);

        let payload = &bytes[HEADER_LEN..];
        let expected = match count.checked_mul(dims).and_then(|n| n.checked_mul(4)) {
            Some(expected) => expected,
            None => bail!(
                "index file corrupt: {} vectors of dimension {} overflow the payload size",
                count,
                dims
            ),
        };
        if payload.len() != expected {
            bail!(
                "index file corrupt: expected {} payload bytes for {} vectors of dimension {}, found {}",
                expected,
                count,
                dims,
                payload.len()
            );
        }

        let data: Vec<f32> = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok((Self { metric, dims, data }, fingerprint))
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        sum += d * d;
    }
    sum
}

/// Inner product of two equal-length vectors.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot
}
