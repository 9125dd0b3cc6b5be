//! Core domain types shared across all ragrepo-core subsystems.
//!
//! These types form the API contract between modules: the forge client,
//! chunker and embedder produce them, the vector store persists them, and
//! the facade returns them to callers. Changing a field here means updating
//! every consumer, so keep this module minimal.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Repo identity
// ---------------------------------------------------------------------------

/// Canonical tenant key: `"{owner}/{repo}@{branch}"`.
///
/// Every stored vector carries this in its metadata; every query must filter
/// on it to guarantee tenant isolation (invariant 2, spec §3).
pub fn repo_id(owner: &str, repo: &str, branch: &str) -> String {
    format!("{owner}/{repo}@{branch}")
}

// ---------------------------------------------------------------------------
// File / chunk records
// ---------------------------------------------------------------------------

/// Metadata attached to a file-level vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Canonical repo identity.
    pub repo_id: String,
    /// Repository owner (user or org).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch this vector was built against.
    pub branch: String,
    /// Path relative to the repository root.
    pub file_path: String,
    /// Discriminator distinguishing file-level from chunk-level records
    /// when both kinds are stored in a shared collection.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FileMetadata {
    /// Build file-level metadata; `kind` is always `"file"`.
    pub fn new(repo_id: String, owner: String, repo: String, branch: String, file_path: String) -> Self {
        Self { repo_id, owner, repo, branch, file_path, kind: "file" }
    }
}

/// Metadata attached to a chunk-level vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Canonical repo identity.
    pub repo_id: String,
    /// Repository owner (user or org).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch this vector was built against.
    pub branch: String,
    /// Path relative to the repository root.
    pub file_path: String,
    /// Start line, 1-based inclusive.
    pub start_line: u32,
    /// End line, 1-based inclusive.
    pub end_line: u32,
    /// Truncated preview of the chunk's text (spec §3: up to 1000 chars).
    pub text: String,
    /// Discriminator; always `"chunk"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// A fully-formed file-level record ready for upsert.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Deterministic ID (C4).
    pub id: String,
    /// Dense embedding of the truncated file body.
    pub vector: Vec<f32>,
    /// Associated metadata.
    pub metadata: FileMetadata,
}

/// A fully-formed chunk-level record ready for upsert.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Deterministic ID (C4).
    pub id: String,
    /// Dense embedding of the chunk's raw text.
    pub vector: Vec<f32>,
    /// Associated metadata.
    pub metadata: ChunkMetadata,
}

// ---------------------------------------------------------------------------
// Vector store query results
// ---------------------------------------------------------------------------

/// A single hit returned from a vector store query, generic over its
/// metadata shape.
#[derive(Debug, Clone)]
pub struct Hit<M> {
    /// Record ID.
    pub id: String,
    /// Cosine similarity in `[-1, 1]` as reported by the store.
    pub score: f32,
    /// Metadata carried by the record.
    pub metadata: M,
}

impl<M> Hit<M> {
    /// Equivalent distance `d = 1 - s`, the metric the retriever sorts by.
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

// ---------------------------------------------------------------------------
// Indexing result
// ---------------------------------------------------------------------------

/// Result of a full `build_embeddings` run (C7 Indexer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    /// Canonical repo identity that was built.
    pub repo_id: String,
    /// Branch actually used (after fallback resolution).
    pub branch: String,
    /// Number of file-level records written.
    pub num_files_indexed: usize,
    /// Number of chunk-level records written.
    pub num_chunks_indexed: usize,
    /// Wall-clock seconds, rounded to 2 decimals.
    pub elapsed: f64,
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// A merged, distance-ranked chunk hit coming out of the retriever (C8).
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// File path the chunk belongs to.
    pub file_path: String,
    /// Start line, 1-based inclusive.
    pub start_line: u32,
    /// End line, 1-based inclusive.
    pub end_line: u32,
    /// Truncated preview text stored in chunk metadata.
    pub text: String,
    /// `1 - score`, ascending order is "best first".
    pub distance: f32,
}

// ---------------------------------------------------------------------------
// Answer / reference (composer output, C9)
// ---------------------------------------------------------------------------

/// A single citation pointing at a line range in a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    /// Path relative to the repository root.
    pub file_path: String,
    /// Start line, 1-based inclusive.
    pub start_line: u32,
    /// End line, 1-based inclusive.
    pub end_line: u32,
    /// Deep link to the exact line range on the forge.
    pub url: String,
}

/// The composer's output: an answer plus its supporting citations.
///
/// `degraded` is never serialized as its own response field -- the
/// degradation marker lives in `text` itself (matching
/// `original_source`'s behavior) -- but callers use it to decide log level
/// and whether `ragrepo-cli` should print a warning.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The composed answer text, verbatim from the LLM or a degraded fallback.
    pub text: String,
    /// Deduplicated references, first-seen order.
    pub references: Vec<Reference>,
    /// True when the LLM was unreachable or unconfigured.
    pub degraded: bool,
}

/// The composer's output for `/summarize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Short summary text.
    pub summary: String,
    /// Longer, comprehensive write-up.
    pub project_paper: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_format() {
        assert_eq!(repo_id("octocat", "hello-world", "main"), "octocat/hello-world@main");
    }

    #[test]
    fn hit_distance_is_one_minus_score() {
        let hit = Hit { id: "x".into(), score: 0.25, metadata: () };
        assert!((hit.distance() - 0.75).abs() < 1e-6);
    }
}
