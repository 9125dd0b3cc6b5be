//! Service facade (C10): the single entry point `ragrepo-service` and
//! `ragrepo-cli` both call into.
//!
//! Owns the process-wide lazily-initialized singletons (embedder, vector
//! store) behind `tokio::sync::OnceCell`, so a second concurrent first
//! request waits for the first's initialization instead of racing it
//! (spec §5 "Shared state", §9 "Process-wide singletons").

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::answer::{self, compose_answer, compose_summary};
use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::{RagError, RagResult};
use crate::forge::ForgeClient;
use crate::indexer;
use crate::retriever;
use crate::types::{repo_id as build_repo_id, Answer, IndexReport, Summary};
use crate::vector::VectorStore;

async fn join_blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> RagResult<T> {
    tokio::task::spawn_blocking(f).await.map_err(|e| RagError::Internal(format!("blocking task panicked: {e}")))
}

pub struct Facade {
    config: Config,
    forge: Arc<ForgeClient>,
    embedder: OnceCell<Arc<Embedder>>,
    store: OnceCell<Arc<VectorStore>>,
}

impl Facade {
    /// Build a facade. The forge client is cheap to construct eagerly; the
    /// embedder and vector store are deferred to first use.
    pub fn new(config: Config) -> RagResult<Self> {
        let forge = Arc::new(ForgeClient::new(config.forge.clone())?);
        Ok(Self { config, forge, embedder: OnceCell::new(), store: OnceCell::new() })
    }

    async fn embedder(&self) -> RagResult<Arc<Embedder>> {
        self.embedder
            .get_or_try_init(|| async {
                let embedding_config = self.config.embedding.clone();
                let embedder = join_blocking(move || Embedder::new(&embedding_config)).await??;
                Ok::<_, RagError>(Arc::new(embedder))
            })
            .await
            .cloned()
    }

    async fn store(&self) -> RagResult<Arc<VectorStore>> {
        // Not using get_or_try_init directly because it needs the embedder's
        // dimensions, which is itself a fallible async step.
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }
        let dimensions = self.embedder().await?.dimensions();
        let vector_store_config = self.config.vector_store.clone();
        let store =
            self.store.get_or_try_init(|| async { VectorStore::connect(vector_store_config, dimensions).map(Arc::new) }).await?;
        Ok(Arc::clone(store))
    }

    /// Resolve the branch to operate against: the caller-supplied branch, or
    /// the forge's default branch.
    async fn resolve_branch(&self, owner: &str, repo: &str, branch: Option<&str>) -> RagResult<String> {
        match branch {
            Some(b) => Ok(b.to_string()),
            None => {
                let forge = Arc::clone(&self.forge);
                let (owner, repo) = (owner.to_string(), repo.to_string());
                join_blocking(move || forge.default_branch(&owner, &repo)).await?
            }
        }
    }

    /// `POST /build_embeddings` (spec §6): (re)build the full index for
    /// `owner/repo` at `branch` (default branch if omitted).
    pub async fn build_embeddings(&self, owner: &str, repo: &str, branch: Option<&str>) -> RagResult<IndexReport> {
        let embedder = self.embedder().await?;
        let store = self.store().await?;
        indexer::build(Arc::clone(&self.forge), embedder, &store, &self.config, owner, repo, branch).await
    }

    /// `POST /query` (spec §6, §4.10): index-if-missing, then retrieve and
    /// compose an answer.
    pub async fn query(
        &self,
        owner: &str,
        repo: &str,
        question: &str,
        branch: Option<&str>,
        top_files: Option<usize>,
        top_chunks: Option<usize>,
    ) -> RagResult<Answer> {
        let embedder = self.embedder().await?;
        let store = self.store().await?;

        let resolved_branch = self.resolve_branch(owner, repo, branch).await?;
        let rid = build_repo_id(owner, repo, &resolved_branch);

        let used_branch = if indexer::is_indexed(&store, &rid, embedder.dimensions()).await? {
            resolved_branch
        } else {
            let report = indexer::build(Arc::clone(&self.forge), Arc::clone(&embedder), &store, &self.config, owner, repo, branch)
                .await?;
            report.branch
        };
        let rid = build_repo_id(owner, repo, &used_branch);

        let chunks = retriever::retrieve(&store, &embedder, &self.config.retrieval, &rid, question, top_files, top_chunks)
            .await?;

        Ok(compose_answer(&self.config.llm, owner, repo, &used_branch, question, &chunks).await)
    }

    /// `POST /summarize` (spec §6, §4.10). Branch resolution intentionally
    /// ignores any notion of a caller-supplied branch -- `original_source`'s
    /// `summarize_repo` takes none, and spec.md §9 calls this out as a
    /// documented quirk, not a bug to fix.
    pub async fn summarize(&self, owner: &str, repo: &str, description: &str) -> RagResult<(Summary, bool, String)> {
        let embedder = self.embedder().await?;
        let store = self.store().await?;

        let resolved_branch = self.resolve_branch(owner, repo, None).await?;
        let rid = build_repo_id(owner, repo, &resolved_branch);

        let already_indexed = indexer::is_indexed(&store, &rid, embedder.dimensions()).await?;
        let used_branch = if already_indexed {
            resolved_branch
        } else {
            let report =
                indexer::build(Arc::clone(&self.forge), Arc::clone(&embedder), &store, &self.config, owner, repo, None).await?;
            report.branch
        };
        let rid = build_repo_id(owner, repo, &used_branch);

        let architecture_chunks = retriever::retrieve(
            &store,
            &embedder,
            &self.config.retrieval,
            &rid,
            "architecture and high-level design of this repository",
            None,
            None,
        )
        .await?;
        let structure_chunks = retriever::retrieve(
            &store,
            &embedder,
            &self.config.retrieval,
            &rid,
            "directory layout and file structure of this repository",
            None,
            None,
        )
        .await?;

        let readme = {
            let forge = Arc::clone(&self.forge);
            let (owner_s, repo_s) = (owner.to_string(), repo.to_string());
            join_blocking(move || forge.fetch_readme(&owner_s, &repo_s)).await?
        };

        let summary = compose_summary(
            &self.config.llm,
            owner,
            repo,
            description,
            readme.as_deref(),
            &answer::format_context(&architecture_chunks),
            &answer::format_context(&structure_chunks),
        )
        .await;

        Ok((summary, already_indexed, used_branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_forge_client_eagerly() {
        let config = Config::from_env();
        assert!(Facade::new(config).is_ok());
    }
}
