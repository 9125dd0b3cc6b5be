//! Indexer (C7): orchestrates the forge client, filter, chunker, embedder
//! and vector store to (re)build a repo's index.
//!
//! Whole-repo, synchronous from the caller's perspective, and not
//! transactional across files -- a partial failure yields a partially
//! indexed repo, which is acceptable because every ID is deterministic and
//! the operation is safely retryable (spec §4.7).
//!
//! Forge calls use a blocking `reqwest` client and ONNX inference is
//! CPU-bound, so both are run via `tokio::task::spawn_blocking` to avoid
//! stalling the async executor (spec §5).

use std::sync::Arc;
use std::time::Instant;

use crate::chunker;
use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::{RagError, RagResult};
use crate::filter;
use crate::forge::ForgeClient;
use crate::identity::sha1_id;
use crate::types::{repo_id as build_repo_id, ChunkMetadata, ChunkRecord, FileMetadata, FileRecord, IndexReport};
use crate::vector::VectorStore;

/// Chunk-record flush boundary: a resource-pacing choice, not a
/// correctness requirement (spec §9).
const CHUNK_FLUSH_BATCH: usize = 200;

async fn join_blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> RagResult<T> {
    tokio::task::spawn_blocking(f).await.map_err(|e| RagError::Internal(format!("blocking task panicked: {e}")))
}

/// Build (or rebuild) the vector index for `owner/repo` at `branch`
/// (defaulting to the forge's default branch).
pub async fn build(
    forge: Arc<ForgeClient>,
    embedder: Arc<Embedder>,
    store: &VectorStore,
    config: &Config,
    owner: &str,
    repo: &str,
    branch: Option<&str>,
) -> RagResult<IndexReport> {
    let start = Instant::now();

    let requested_branch = match branch {
        Some(b) => b.to_string(),
        None => {
            let forge = Arc::clone(&forge);
            let (owner, repo) = (owner.to_string(), repo.to_string());
            join_blocking(move || forge.default_branch(&owner, &repo)).await??
        }
    };

    let (entries, used_branch) = {
        let forge = Arc::clone(&forge);
        let (owner, repo, requested_branch) = (owner.to_string(), repo.to_string(), requested_branch.clone());
        join_blocking(move || forge.list_tree(&owner, &repo, &requested_branch)).await??
    };

    let rid = build_repo_id(owner, repo, &used_branch);

    let mut file_batch: Vec<FileRecord> = Vec::new();
    let mut chunk_batch: Vec<ChunkRecord> = Vec::new();
    let mut num_files = 0usize;
    let mut num_chunks = 0usize;

    for entry in entries.into_iter().filter(|e| filter::is_indexable(&e.path)) {
        let body = {
            let forge = Arc::clone(&forge);
            let (owner, repo, branch, path) = (owner.to_string(), repo.to_string(), used_branch.clone(), entry.path.clone());
            join_blocking(move || forge.fetch_raw(&owner, &repo, &branch, &path)).await?
        };
        let Some(body) = body else {
            tracing::warn!(owner, repo, path = %entry.path, "raw fetch failed or skipped, omitting from index");
            continue;
        };

        let prefix: String = body.chars().take(config.chunking.file_embed_prefix_chars).collect();
        let file_vector = {
            let embedder = Arc::clone(&embedder);
            let prefix = prefix.clone();
            join_blocking(move || embedder.embed_single(&prefix)).await??
        };
        let file_id = sha1_id(&rid, &entry.path, None, None);
        file_batch.push(FileRecord {
            id: file_id,
            vector: file_vector,
            metadata: FileMetadata::new(
                rid.clone(),
                owner.to_string(),
                repo.to_string(),
                used_branch.clone(),
                entry.path.clone(),
            ),
        });
        num_files += 1;

        let spans = chunker::chunk_text(&body, &config.chunking);
        if !spans.is_empty() {
            let vectors = {
                let embedder = Arc::clone(&embedder);
                let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
                join_blocking(move || {
                    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                    embedder.embed_batch(&refs)
                })
                .await??
            };

            for (span, vector) in spans.iter().zip(vectors.into_iter()) {
                let chunk_id = sha1_id(&rid, &entry.path, Some(span.start_line), Some(span.end_line));
                let preview: String = span.text.chars().take(config.chunking.preview_chars).collect();
                chunk_batch.push(ChunkRecord {
                    id: chunk_id,
                    vector,
                    metadata: ChunkMetadata {
                        repo_id: rid.clone(),
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                        branch: used_branch.clone(),
                        file_path: entry.path.clone(),
                        start_line: span.start_line,
                        end_line: span.end_line,
                        text: preview,
                        kind: "chunk",
                    },
                });
                num_chunks += 1;

                if chunk_batch.len() >= CHUNK_FLUSH_BATCH {
                    store.upsert_chunks(&rid, &chunk_batch).await?;
                    chunk_batch.clear();
                }
            }
        }
    }

    store.upsert_files(&rid, &file_batch).await?;
    store.upsert_chunks(&rid, &chunk_batch).await?;

    let elapsed = (start.elapsed().as_secs_f64() * 100.0).round() / 100.0;

    Ok(IndexReport {
        repo_id: rid,
        branch: used_branch,
        num_files_indexed: num_files,
        num_chunks_indexed: num_chunks,
        elapsed,
    })
}

/// Check whether a repo is already indexed: a bounded `top_k=1` query
/// against the `files` collection filtered by `repo_id` (C10 contract).
pub async fn is_indexed(store: &VectorStore, repo_id: &str, dimensions: usize) -> RagResult<bool> {
    // A zero vector is sufficient: we only care whether any row exists for
    // this repo_id, not which is closest.
    let probe = vec![0.0f32; dimensions];
    let hits = store.query_files(repo_id, &probe, 1).await?;
    Ok(!hits.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_flush_batch_matches_spec() {
        assert_eq!(CHUNK_FLUSH_BATCH, 200);
    }
}
