//! Vector store adapter (C6), backed by Qdrant.
//!
//! Qdrant stands in for the spec's "Pinecone or equivalent" backend: its
//! collections are Pinecone's indexes, its payload filters are Pinecone's
//! metadata filters, and it exposes the same upsert-with-id /
//! query-top-k-with-filter shape the two-collection, capacity-limited
//! adapter design needs. `PINECONE_MAX_INDEXES` is kept as the capacity
//! knob's env var name for spec fidelity even though the backend is Qdrant.
//!
//! Unlike Pinecone, Qdrant's point IDs accept only an unsigned integer or a
//! UUID -- the 40-hex-char SHA-1 strings `identity::sha1_id` produces are
//! neither, and the server rejects them outright. `qdrant_point_id` derives
//! a deterministic UUID from each SHA-1's leading 32 hex chars so the same
//! `(repo_id, path, start_line, end_line)` always maps to the same point,
//! preserving the idempotent-upsert contract (invariant 1, spec §3); the
//! original SHA-1 is also carried in the payload so it stays reconstructible.

use std::collections::HashSet;
use std::sync::RwLock;

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

use crate::config::VectorStoreConfig;
use crate::error::{RagError, RagResult};
use crate::types::{ChunkMetadata, ChunkRecord, FileMetadata, FileRecord, Hit};

/// Derive a deterministic Qdrant point ID (a UUID) from a `sha1_id` hex
/// string. Qdrant rejects arbitrary strings as point IDs; the first 32 of
/// the SHA-1's 40 hex chars become the UUID's 16 bytes, so identical
/// coordinates always produce the identical point ID.
fn qdrant_point_id(sha1_hex: &str) -> String {
    let bytes = hex::decode(&sha1_hex[..32])
        .expect("sha1_id always yields a 40-char lowercase hex string");
    let mut arr = [0u8; 16];
    arr.copy_from_slice(&bytes);
    Uuid::from_bytes(arr).to_string()
}

/// Which logical collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// File-level vectors.
    Files,
    /// Chunk-level vectors.
    Chunks,
}

impl CollectionKind {
    fn shared_name(self) -> &'static str {
        match self {
            Self::Files => "ragrepo-files",
            Self::Chunks => "ragrepo-chunks",
        }
    }

    fn legacy_name(self, repo_id: &str) -> String {
        let suffix = match self {
            Self::Files => "files",
            Self::Chunks => "chunks",
        };
        sanitize_collection_name(&format!("{repo_id}-{suffix}"))
    }
}

/// Sanitize a candidate collection name: lowercase alphanumerics plus `-`,
/// truncated to 45 chars; empty names fall back to `default-index`.
pub fn sanitize_collection_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    sanitized.truncate(45);
    if sanitized.is_empty() {
        "default-index".to_string()
    } else {
        sanitized
    }
}

/// Adapter over a Qdrant client implementing the two-collection,
/// capacity-limited store-adapter contract.
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
    dimensions: usize,
    /// Collections confirmed to exist, to avoid a round-trip on every call.
    known_collections: RwLock<HashSet<String>>,
}

impl VectorStore {
    /// Connect to the configured Qdrant endpoint.
    pub fn connect(config: VectorStoreConfig, dimensions: usize) -> RagResult<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| RagError::VectorStore(format!("failed to connect to vector store: {e}")))?;

        Ok(Self {
            client,
            config,
            dimensions,
            known_collections: RwLock::new(HashSet::new()),
        })
    }

    /// Resolve which physical collection name a repo's operations for
    /// `kind` should target, applying the capacity policy (spec §4.6):
    /// prefer the shared collection; only use a legacy per-repo collection
    /// if one already exists. This adapter never attempts to create a new
    /// per-repo collection, so a capacity refusal can only ever come from
    /// creating the shared collection itself -- at that point there is no
    /// narrower collection to fall back to, and `ensure_collection` surfaces
    /// `RagError::VectorStoreCapacity` directly (spec §4.6 bullet 3).
    async fn resolve_collection(&self, kind: CollectionKind, repo_id: &str) -> RagResult<String> {
        let legacy = kind.legacy_name(repo_id);
        if self.collection_exists(&legacy).await? {
            return Ok(legacy);
        }

        self.ensure_collection(kind.shared_name()).await?;
        Ok(kind.shared_name().to_string())
    }

    async fn collection_exists(&self, name: &str) -> RagResult<bool> {
        if self.known_collections.read().unwrap_or_else(|p| p.into_inner()).contains(name) {
            return Ok(true);
        }
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| RagError::VectorStore(format!("collection existence check failed: {e}")))?;
        if exists {
            self.known_collections.write().unwrap_or_else(|p| p.into_inner()).insert(name.to_string());
        }
        Ok(exists)
    }

    async fn ensure_collection(&self, name: &str) -> RagResult<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }

        let existing = self
            .client
            .list_collections()
            .await
            .map_err(|e| RagError::VectorStore(format!("failed to list collections: {e}")))?;

        if existing.collections.len() >= self.config.max_indexes {
            return Err(RagError::VectorStoreCapacity(format!(
                "cannot create collection {name}: at capacity ({} of {} physical collections)",
                existing.collections.len(),
                self.config.max_indexes
            )));
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(self.dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| RagError::VectorStore(format!("failed to create collection {name}: {e}")))?;

        self.known_collections.write().unwrap_or_else(|p| p.into_inner()).insert(name.to_string());
        Ok(())
    }

    /// Upsert a batch of file-level records.
    pub async fn upsert_files(&self, repo_id: &str, records: &[FileRecord]) -> RagResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let collection = self.resolve_collection(CollectionKind::Files, repo_id).await?;
        let points: Vec<PointStruct> = records
            .iter()
            .map(|r| PointStruct::new(qdrant_point_id(&r.id), r.vector.clone(), file_payload(&r.id, &r.metadata)))
            .collect();
        self.upsert_points(&collection, points).await
    }

    /// Upsert a batch of chunk-level records.
    pub async fn upsert_chunks(&self, repo_id: &str, records: &[ChunkRecord]) -> RagResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let collection = self.resolve_collection(CollectionKind::Chunks, repo_id).await?;
        let points: Vec<PointStruct> = records
            .iter()
            .map(|r| PointStruct::new(qdrant_point_id(&r.id), r.vector.clone(), chunk_payload(&r.id, &r.metadata)))
            .collect();
        self.upsert_points(&collection, points).await
    }

    async fn upsert_points(&self, collection: &str, points: Vec<PointStruct>) -> RagResult<()> {
        // Resource cap: upsert batch size <= 100 (spec §5).
        for batch in points.chunks(100) {
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection, batch.to_vec()))
                .await
                .map_err(|e| RagError::VectorStore(format!("upsert into {collection} failed: {e}")))?;
        }
        Ok(())
    }

    /// Query the `files` collection, filtered by `repo_id`.
    pub async fn query_files(&self, repo_id: &str, vector: &[f32], top_k: usize) -> RagResult<Vec<Hit<FileMetadata>>> {
        let collection = self.resolve_collection(CollectionKind::Files, repo_id).await?;
        let filter = Filter::must([Condition::matches("repo_id", repo_id.to_string())]);
        self.search(&collection, vector, top_k, filter).await
    }

    /// Query the `chunks` collection, filtered by `repo_id` and `file_path`.
    pub async fn query_chunks(
        &self,
        repo_id: &str,
        file_path: &str,
        vector: &[f32],
        top_k: usize,
    ) -> RagResult<Vec<Hit<ChunkMetadata>>> {
        let collection = self.resolve_collection(CollectionKind::Chunks, repo_id).await?;
        let filter = Filter::must([
            Condition::matches("repo_id", repo_id.to_string()),
            Condition::matches("file_path", file_path.to_string()),
        ]);
        self.search(&collection, vector, top_k, filter).await
    }

    async fn search<M: FromPayload>(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Filter,
    ) -> RagResult<Vec<Hit<M>>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(SearchPointsBuilder::new(collection, vector.to_vec(), top_k as u64).filter(filter))
            .await
            .map_err(|e| RagError::VectorStore(format!("query against {collection} failed: {e}")))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.clone().map(|id| format!("{id:?}")).unwrap_or_default();
                M::from_payload(&point.payload).map(|metadata| Hit { id, score: point.score, metadata })
            })
            .collect())
    }
}

fn file_payload(id: &str, m: &FileMetadata) -> qdrant_client::Payload {
    let mut payload = qdrant_client::Payload::new();
    payload.insert("sha1_id", id.to_string());
    payload.insert("repo_id", m.repo_id.clone());
    payload.insert("owner", m.owner.clone());
    payload.insert("repo", m.repo.clone());
    payload.insert("branch", m.branch.clone());
    payload.insert("file_path", m.file_path.clone());
    payload.insert("type", m.kind);
    payload
}

fn chunk_payload(id: &str, m: &ChunkMetadata) -> qdrant_client::Payload {
    let mut payload = qdrant_client::Payload::new();
    payload.insert("sha1_id", id.to_string());
    payload.insert("repo_id", m.repo_id.clone());
    payload.insert("owner", m.owner.clone());
    payload.insert("repo", m.repo.clone());
    payload.insert("branch", m.branch.clone());
    payload.insert("file_path", m.file_path.clone());
    payload.insert("start_line", m.start_line as i64);
    payload.insert("end_line", m.end_line as i64);
    payload.insert("text", m.text.clone());
    payload.insert("type", m.kind);
    payload
}

/// Reconstruct typed metadata from a Qdrant payload map.
trait FromPayload: Sized {
    fn from_payload(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> Option<Self>;
}

fn get_str(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn get_i64(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}

impl FromPayload for FileMetadata {
    fn from_payload(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> Option<Self> {
        Some(FileMetadata {
            repo_id: get_str(payload, "repo_id")?,
            owner: get_str(payload, "owner")?,
            repo: get_str(payload, "repo")?,
            branch: get_str(payload, "branch")?,
            file_path: get_str(payload, "file_path")?,
            kind: "file",
        })
    }
}

impl FromPayload for ChunkMetadata {
    fn from_payload(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> Option<Self> {
        Some(ChunkMetadata {
            repo_id: get_str(payload, "repo_id")?,
            owner: get_str(payload, "owner")?,
            repo: get_str(payload, "repo")?,
            branch: get_str(payload, "branch")?,
            file_path: get_str(payload, "file_path")?,
            start_line: get_i64(payload, "start_line")? as u32,
            end_line: get_i64(payload, "end_line")? as u32,
            text: get_str(payload, "text")?,
            kind: "chunk",
        })
    }
}

/// L2-normalize a vector in place (used by the embedder's pooled output).
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_replaces_invalid_chars() {
        assert_eq!(sanitize_collection_name("Owner/Repo@main"), "owner-repo-main");
    }

    #[test]
    fn sanitize_truncates_to_45_chars() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_collection_name(&long).len(), 45);
    }

    #[test]
    fn sanitize_empty_falls_back_to_default() {
        assert_eq!(sanitize_collection_name(""), "default-index");
    }

    #[test]
    fn sanitize_all_invalid_chars_still_produces_a_name() {
        assert_eq!(sanitize_collection_name("###"), "---");
    }

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_is_noop() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn qdrant_point_id_is_a_valid_uuid() {
        let sha1 = crate::identity::sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        let point_id = qdrant_point_id(&sha1);
        assert!(Uuid::parse_str(&point_id).is_ok());
    }

    #[test]
    fn qdrant_point_id_is_deterministic() {
        let sha1 = crate::identity::sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        assert_eq!(qdrant_point_id(&sha1), qdrant_point_id(&sha1));
    }

    #[test]
    fn qdrant_point_id_differs_for_different_coordinates() {
        let a = crate::identity::sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        let b = crate::identity::sha1_id("x/y@main", "a/b.py", Some(1), Some(41));
        assert_ne!(qdrant_point_id(&a), qdrant_point_id(&b));
    }
}
