//! Two-stage hierarchical retriever (C8).
//!
//! Stage one narrows to the `top_files` most relevant files; stage two pulls
//! `per_file` chunks from each of those files and merges the results. This
//! keeps the chunk-level search filtered to a small, relevant file set
//! instead of scanning the whole repo's chunks collection per query.

use crate::config::RetrievalConfig;
use crate::embedder::Embedder;
use crate::error::RagResult;
use crate::types::RetrievedChunk;
use crate::vector::VectorStore;

/// Run the two-stage retrieval described in spec §4.8 and return chunks
/// sorted ascending by distance (best first), truncated to `top_chunks`.
///
/// An empty return value is not an error -- it is the well-formed "nothing
/// relevant found" result the caller (the answer composer) turns into a
/// degraded-success answer.
pub async fn retrieve(
    store: &VectorStore,
    embedder: &Embedder,
    config: &RetrievalConfig,
    repo_id: &str,
    question: &str,
    top_files: Option<usize>,
    top_chunks: Option<usize>,
) -> RagResult<Vec<RetrievedChunk>> {
    let top_files = top_files.unwrap_or(config.top_files).max(1);
    let top_chunks = top_chunks.unwrap_or(config.top_chunks).max(1);

    let question_vector = embedder.embed_single(question)?;

    let file_hits = store.query_files(repo_id, &question_vector, top_files).await?;
    if file_hits.is_empty() {
        return Ok(Vec::new());
    }

    let per_file = (top_chunks / file_hits.len().max(1)).max(1);

    let mut merged: Vec<RetrievedChunk> = Vec::new();
    for file_hit in &file_hits {
        let chunk_hits =
            store.query_chunks(repo_id, &file_hit.metadata.file_path, &question_vector, per_file).await?;
        for hit in chunk_hits {
            merged.push(RetrievedChunk {
                file_path: hit.metadata.file_path,
                start_line: hit.metadata.start_line,
                end_line: hit.metadata.end_line,
                text: hit.metadata.text,
                distance: hit.distance(),
            });
        }
    }

    // Stable sort: ties keep the insertion order established above, which
    // follows the file-stage ranking (spec §4.8 tie-break policy).
    merged.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(top_chunks);

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(distance: f32, path: &str) -> RetrievedChunk {
        RetrievedChunk { file_path: path.to_string(), start_line: 1, end_line: 2, text: String::new(), distance }
    }

    #[test]
    fn per_file_division_matches_spec_formula() {
        // per_file = max(1, top_chunks // max(1, |file_paths|))
        let top_chunks = 12usize;
        let num_files = 8usize;
        assert_eq!((top_chunks / num_files).max(1), 1);

        let num_files = 3usize;
        assert_eq!((top_chunks / num_files).max(1), 4);
    }

    #[test]
    fn merge_sort_is_ascending_by_distance_and_stable() {
        let mut merged = vec![chunk(0.5, "b.rs"), chunk(0.1, "a.rs"), chunk(0.5, "a.rs"), chunk(0.2, "c.rs")];
        merged.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        let distances: Vec<f32> = merged.iter().map(|c| c.distance).collect();
        assert_eq!(distances, vec![0.1, 0.2, 0.5, 0.5]);
        // the two tied 0.5 entries keep their relative order: "b.rs" before "a.rs"
        assert_eq!(merged[2].file_path, "b.rs");
        assert_eq!(merged[3].file_path, "a.rs");
    }
}
