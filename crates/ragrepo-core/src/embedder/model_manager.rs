//! Automatic embedding model management.
//!
//! Downloads and caches the ONNX embedding model and tokenizer on first
//! use. Models are stored in `~/.ragrepo/models/<model-name>/`.
//!
//! ## Model selection
//!
//! Default model: `all-MiniLM-L6-v2` -- 384 dimensions, 256 max sequence
//! length, matching `EMBEDDING_MODEL`'s spec default. `all-mpnet-base-v2` is
//! offered as a higher-dimension alternative. The `EMBEDDING_MODEL` env var
//! selects among this small fixed table; an unrecognized value logs a
//! warning and falls back to the default rather than failing the request.
//!
//! ## Zero-hassle philosophy
//!
//! Callers should never manually download models. The engine auto-detects
//! missing models and downloads them with progress reporting. After
//! download, the model path is stable and cached forever.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RagError, RagResult};

/// Metadata for a supported embedding model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Human-readable model name, also the `EMBEDDING_MODEL` selector value.
    pub name: &'static str,
    /// HuggingFace model ID.
    pub hf_repo: &'static str,
    /// URL to the ONNX model file.
    pub model_url: &'static str,
    /// URL to the tokenizer.json file.
    pub tokenizer_url: &'static str,
    /// Output embedding dimensions.
    pub dimensions: usize,
    /// Maximum sequence length the model supports.
    pub max_seq_length: usize,
    /// Approximate download size in bytes (for progress display).
    pub approx_size_bytes: u64,
}

/// Default model: MiniLM-L6-v2 -- small, fast, widely used general-purpose
/// sentence embedding model. 384 dimensions keeps the vector store's
/// per-vector footprint small; 256 tokens comfortably covers a chunk up to
/// `MAX_CHARS=1800` characters.
pub const DEFAULT_MODEL: ModelSpec = ModelSpec {
    name: "all-MiniLM-L6-v2",
    hf_repo: "sentence-transformers/all-MiniLM-L6-v2",
    model_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
    tokenizer_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
    dimensions: 384,
    max_seq_length: 256,
    approx_size_bytes: 90_000_000,
};

/// Alternative model: MPNet-base-v2 -- higher-dimension, higher-quality
/// embeddings at roughly 4x the inference cost of the default.
pub const MPNET_MODEL: ModelSpec = ModelSpec {
    name: "all-mpnet-base-v2",
    hf_repo: "sentence-transformers/all-mpnet-base-v2",
    model_url: "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main/onnx/model.onnx",
    tokenizer_url: "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main/tokenizer.json",
    dimensions: 768,
    max_seq_length: 384,
    approx_size_bytes: 420_000_000,
};

/// Get the models directory: `~/.ragrepo/models/`
fn models_base_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("ragrepo").join("models")
}

/// Get the directory for a specific model: `~/.ragrepo/models/<name>/`
pub fn model_dir(spec: &ModelSpec) -> PathBuf {
    models_base_dir().join(spec.name)
}

/// Get the path to the ONNX model file for a given spec.
pub fn model_path(spec: &ModelSpec) -> PathBuf {
    model_dir(spec).join("model.onnx")
}

/// Get the path to the tokenizer file for a given spec.
pub fn tokenizer_path(spec: &ModelSpec) -> PathBuf {
    model_dir(spec).join("tokenizer.json")
}

/// Check if the model files exist and are valid.
pub fn is_model_ready(spec: &ModelSpec) -> bool {
    let model = model_path(spec);
    let tokenizer = tokenizer_path(spec);

    if !model.exists() || !tokenizer.exists() {
        return false;
    }

    if let Ok(meta) = std::fs::metadata(&model) {
        if meta.len() < 1_000_000 {
            return false;
        }
    }

    true
}

/// Ensure the model is available, downloading if necessary.
///
/// Returns the paths to (model.onnx, tokenizer.json).
pub fn ensure_model(spec: &ModelSpec) -> RagResult<(PathBuf, PathBuf)> {
    let model = model_path(spec);
    let tokenizer = tokenizer_path(spec);

    if is_model_ready(spec) {
        tracing::debug!(model = spec.name, path = %model.display(), "embedding model already cached");
        return Ok((model, tokenizer));
    }

    let dir = model_dir(spec);
    std::fs::create_dir_all(&dir)?;

    tracing::info!(model = spec.name, repo = spec.hf_repo, "downloading embedding model (first-time setup)");

    if !model.exists() || std::fs::metadata(&model).map(|m| m.len() < 1_000_000).unwrap_or(true) {
        download_file(spec.model_url, &model, &format!("Downloading {} model", spec.name), Some(spec.approx_size_bytes))?;
    }

    if !tokenizer.exists() {
        download_file(spec.tokenizer_url, &tokenizer, &format!("Downloading {} tokenizer", spec.name), None)?;
    }

    tracing::info!(model = spec.name, path = %model.display(), "embedding model ready");

    Ok((model, tokenizer))
}

fn download_file(url: &str, dest: &Path, message: &str, expected_size: Option<u64>) -> RagResult<()> {
    let temp_path = dest.with_extension("downloading");

    let response = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()
        .map_err(|e| RagError::Internal(format!("HTTP client error: {e}")))?
        .get(url)
        .send()
        .map_err(|e| {
            RagError::Internal(format!(
                "failed to download model from {url}: {e}\n\
                 Hint: check your internet connection, or pre-populate the model cache manually."
            ))
        })?;

    if !response.status().is_success() {
        return Err(RagError::Internal(format!("model download failed: HTTP {} from {url}", response.status())));
    }

    let total_size = response.content_length().or(expected_size).unwrap_or(0);

    let pb = if total_size > 0 {
        let pb = indicatif::ProgressBar::new(total_size);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{msg}\n  [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message(message.to_string());
        pb
    } else {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        pb
    };

    let mut file = std::fs::File::create(&temp_path)?;
    let mut downloaded: u64 = 0;

    let bytes = response.bytes().map_err(|e| RagError::Internal(format!("download stream error: {e}")))?;

    for chunk in bytes.chunks(8192) {
        file.write_all(chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    pb.finish_with_message(format!("{message} -- done"));

    std::fs::rename(&temp_path, dest)?;

    Ok(())
}

/// Resolve a `ModelSpec` from the `EMBEDDING_MODEL`-style model name.
///
/// - `"all-MiniLM-L6-v2"` (case-insensitive) or unrecognized -> `DEFAULT_MODEL`.
/// - `"all-mpnet-base-v2"` -> `MPNET_MODEL`.
pub fn resolve_model_spec(model_name: &str) -> &'static ModelSpec {
    match model_name.to_lowercase().as_str() {
        "all-mpnet-base-v2" | "mpnet" => &MPNET_MODEL,
        "all-minilm-l6-v2" | "minilm" | "" => &DEFAULT_MODEL,
        other => {
            tracing::warn!(model = other, "unrecognized EMBEDDING_MODEL value, falling back to default");
            &DEFAULT_MODEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_dir_structure() {
        let dir = model_dir(&DEFAULT_MODEL);
        assert!(dir.ends_with("all-MiniLM-L6-v2"));

        let model = model_path(&DEFAULT_MODEL);
        assert!(model.ends_with("model.onnx"));

        let tokenizer = tokenizer_path(&DEFAULT_MODEL);
        assert!(tokenizer.ends_with("tokenizer.json"));
    }

    #[test]
    fn mpnet_different_path_from_default() {
        assert_ne!(model_dir(&DEFAULT_MODEL), model_dir(&MPNET_MODEL));
    }

    #[test]
    fn resolve_default_on_unrecognized() {
        let spec = resolve_model_spec("something-weird");
        assert_eq!(spec.dimensions, 384);
    }

    #[test]
    fn resolve_mpnet_by_name() {
        let spec = resolve_model_spec("all-mpnet-base-v2");
        assert_eq!(spec.dimensions, 768);
    }

    #[test]
    fn model_not_ready_when_missing() {
        let dummy = ModelSpec {
            name: "non-existent-model-xyz-123",
            hf_repo: "fake/repo",
            model_url: "http://fake.com",
            tokenizer_url: "http://fake.com",
            dimensions: 10,
            max_seq_length: 10,
            approx_size_bytes: 10,
        };
        assert!(!is_model_ready(&dummy));
    }

    #[test]
    fn default_model_constants() {
        assert_eq!(DEFAULT_MODEL.dimensions, 384);
        assert_eq!(DEFAULT_MODEL.max_seq_length, 256);
        assert!(DEFAULT_MODEL.model_url.starts_with("https://"));
    }
}
