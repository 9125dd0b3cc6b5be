//! HTTP handlers for the `/`, `/build_embeddings`, `/query`, `/summarize`
//! endpoints (spec §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use ragrepo_core::{Facade, RagError};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    message: String,
    cors_enabled: bool,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "ragrepo: RAG question-answering over public code-forge repositories".to_string(),
        cors_enabled: true,
    })
}

#[derive(Debug, Deserialize)]
pub struct BuildEmbeddingsRequest {
    owner: String,
    repo: String,
    #[serde(default)]
    branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BuildEmbeddingsResponse {
    repo_id: String,
    branch: String,
    num_files_indexed: usize,
    num_chunks_indexed: usize,
    took_seconds: f64,
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError(RagError::Validation(format!("`{field}` must not be empty"))));
    }
    Ok(())
}

pub async fn build_embeddings(
    State(facade): State<Arc<Facade>>,
    Json(req): Json<BuildEmbeddingsRequest>,
) -> Result<Json<BuildEmbeddingsResponse>, AppError> {
    require_non_empty("owner", &req.owner)?;
    require_non_empty("repo", &req.repo)?;

    let report = facade.build_embeddings(&req.owner, &req.repo, req.branch.as_deref()).await?;

    Ok(Json(BuildEmbeddingsResponse {
        repo_id: report.repo_id,
        branch: report.branch,
        num_files_indexed: report.num_files_indexed,
        num_chunks_indexed: report.num_chunks_indexed,
        took_seconds: report.elapsed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    owner: String,
    repo: String,
    question: String,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    top_files: Option<usize>,
    #[serde(default)]
    top_chunks: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    file_path: String,
    start_line: u32,
    end_line: u32,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    answer: String,
    references: Vec<ReferenceResponse>,
}

pub async fn query(
    State(facade): State<Arc<Facade>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    require_non_empty("owner", &req.owner)?;
    require_non_empty("repo", &req.repo)?;
    require_non_empty("question", &req.question)?;

    let answer = facade
        .query(&req.owner, &req.repo, &req.question, req.branch.as_deref(), req.top_files, req.top_chunks)
        .await?;

    Ok(Json(QueryResponse {
        answer: answer.text,
        references: answer
            .references
            .into_iter()
            .map(|r| ReferenceResponse { file_path: r.file_path, start_line: r.start_line, end_line: r.end_line, url: r.url })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    owner: String,
    repo: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    summary: String,
    project_paper: String,
    indexed: bool,
    branch: String,
}

pub async fn summarize(
    State(facade): State<Arc<Facade>>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    require_non_empty("owner", &req.owner)?;
    require_non_empty("repo", &req.repo)?;

    let (summary, indexed, branch) = facade.summarize(&req.owner, &req.repo, &req.description).await?;

    Ok(Json(SummarizeResponse { summary: summary.summary, project_paper: summary.project_paper, indexed, branch }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_non_empty_rejects_blank() {
        assert!(require_non_empty("owner", "").is_err());
        assert!(require_non_empty("owner", "   ").is_err());
        assert!(require_non_empty("owner", "octocat").is_ok());
    }
}
