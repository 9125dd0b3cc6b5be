//! Forge client (C1): talks to a GitHub-style code-forge over HTTPS.
//!
//! Built on a blocking `reqwest` client run from `tokio::task::spawn_blocking`,
//! the same pattern `embedder::model_manager::download_file` uses for model
//! downloads, generalized here to an async-friendly wrapper. Tree listing and
//! branch resolution hit `api.github.com`; raw file bodies come from
//! `raw.githubusercontent.com` -- the two hosts `original_source` hits.

use std::time::Duration;

use serde::Deserialize;

use crate::config::ForgeConfig;
use crate::error::{RagError, RagResult};

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";

/// A blob-type entry from a recursive tree listing.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Path relative to the repository root.
    pub path: String,
}

/// Client for a single code-forge host (GitHub by default).
pub struct ForgeClient {
    config: ForgeConfig,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct RepoMeta {
    default_branch: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

impl ForgeClient {
    /// Build a client from resolved configuration.
    pub fn new(config: ForgeConfig) -> RagResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("ragrepo/0.3")
            .build()
            .map_err(|e| RagError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn auth(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.config.token {
            Some(token) => builder.header("Authorization", format!("token {token}")),
            None => builder,
        }
    }

    /// Resolve the repository's default branch.
    pub fn default_branch(&self, owner: &str, repo: &str) -> RagResult<String> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}");
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(self.config.tree_timeout_secs))
            .send()
            .map_err(|e| RagError::ForgeUnavailable(format!("repo metadata fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RagError::ForgeUnavailable(format!(
                "repo metadata fetch failed: HTTP {}",
                resp.status()
            )));
        }

        let meta: RepoMeta = resp
            .json()
            .map_err(|e| RagError::ForgeUnavailable(format!("invalid repo metadata response: {e}")))?;
        Ok(meta.default_branch)
    }

    /// List every blob path in a recursive tree, retrying against the
    /// alternate of `{main, master}` if the requested branch fails.
    ///
    /// Returns `(entries, branch_used)` -- the branch actually listed, which
    /// may differ from the one requested (fixes the citation-URL bug spec.md
    /// §9 flags for correction).
    pub fn list_tree(&self, owner: &str, repo: &str, branch: &str) -> RagResult<(Vec<TreeEntry>, String)> {
        match self.list_tree_single(owner, repo, branch) {
            Ok(entries) => Ok((entries, branch.to_string())),
            Err(primary_err) => {
                let alternate = match branch {
                    "main" => "master",
                    "master" => "main",
                    _ => {
                        return Err(primary_err);
                    }
                };
                match self.list_tree_single(owner, repo, alternate) {
                    Ok(entries) => {
                        tracing::warn!(owner, repo, requested = branch, used = alternate, "branch fallback");
                        Ok((entries, alternate.to_string()))
                    }
                    Err(_) => Err(primary_err),
                }
            }
        }
    }

    fn list_tree_single(&self, owner: &str, repo: &str, branch: &str) -> RagResult<Vec<TreeEntry>> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}/git/trees/{branch}?recursive=1");
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(self.config.tree_timeout_secs))
            .send()
            .map_err(|e| RagError::ForgeUnavailable(format!("tree listing failed for {branch}: {e}")))?;

        if !resp.status().is_success() {
            return Err(RagError::ForgeUnavailable(format!(
                "tree listing failed for {branch}: HTTP {}",
                resp.status()
            )));
        }

        let parsed: TreeResponse = resp
            .json()
            .map_err(|e| RagError::ForgeUnavailable(format!("invalid tree response: {e}")))?;

        if parsed.truncated {
            tracing::warn!(owner, repo, branch, "tree listing truncated by forge, indexing a partial tree");
        }

        Ok(parsed
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob")
            .map(|item| TreeEntry { path: item.path })
            .collect())
    }

    /// Fetch a file's raw body. Returns `Ok(None)` (skip) when the body
    /// exceeds the configured size cap, contains a NUL byte, or the
    /// network call fails -- never propagates a per-file failure.
    pub fn fetch_raw(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Option<String> {
        let url = format!("{RAW_BASE}/{owner}/{repo}/{branch}/{path}");
        let resp = match self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(self.config.raw_timeout_secs))
            .send()
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(owner, repo, path, error = %e, "raw fetch failed, skipping file");
                return None;
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(owner, repo, path, status = %resp.status(), "raw fetch non-success, skipping file");
            return None;
        }

        let bytes = match resp.bytes() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(owner, repo, path, error = %e, "raw fetch body read failed, skipping file");
                return None;
            }
        };

        if bytes.len() as u64 > self.config.max_body_bytes {
            tracing::debug!(owner, repo, path, size = bytes.len(), "file exceeds size cap, skipping");
            return None;
        }

        if bytes.contains(&0u8) {
            tracing::debug!(owner, repo, path, "file contains NUL byte, treating as binary, skipping");
            return None;
        }

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::debug!(owner, repo, path, "file is not valid UTF-8, skipping");
                None
            }
        }
    }

    /// Fetch the repository's README as plain text, for the `/summarize`
    /// fallback path (§4.9 additions). Present in `original_source`'s
    /// `_fallback_readme_summary` / `summarize_repo` but absent from
    /// spec.md's distillation.
    pub fn fetch_readme(&self, owner: &str, repo: &str) -> Option<String> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}/readme");
        let resp = self
            .auth(self.client.get(&url).header("Accept", "application/vnd.github.v3.raw"))
            .timeout(Duration::from_secs(self.config.raw_timeout_secs))
            .send()
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        resp.text().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_no_token() {
        let config = ForgeConfig {
            token: None,
            raw_timeout_secs: 15,
            tree_timeout_secs: 20,
            max_body_bytes: 500 * 1024,
        };
        assert!(ForgeClient::new(config).is_ok());
    }
}
