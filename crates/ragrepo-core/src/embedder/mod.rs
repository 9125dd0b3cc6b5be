//! ONNX-based local embedding engine with automatic model management (C5).
//!
//! Runs embedding inference locally using ONNX Runtime: no network calls
//! during inference, no API keys. The model file is downloaded on first use
//! and cached permanently in `~/.ragrepo/models/<model-name>/`.
//!
//! Unlike the keyword-search fallback a local code index can lean on when
//! its embedder is unavailable, this service has no non-vector retrieval
//! path -- indexing without a loaded model is refused outright
//! (`RagError::ModelUnavailable`), not silently degraded.

pub mod model_manager;

use ort::session::Session;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, RagResult};

pub use model_manager::{DEFAULT_MODEL, MPNET_MODEL, ModelSpec};

/// Embedding engine that uses ONNX Runtime for local inference.
pub struct Embedder {
    spec: &'static ModelSpec,
    batch_size: usize,
    session: std::sync::Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

impl Embedder {
    /// Create a new embedder, auto-downloading the configured model if
    /// necessary. Fails with `RagError::ModelUnavailable` if the model or
    /// tokenizer cannot be loaded -- there is no degraded mode to fall back
    /// to.
    pub fn new(config: &EmbeddingConfig) -> RagResult<Self> {
        let spec = model_manager::resolve_model_spec(&config.model_name);

        let (model_path, tokenizer_path) = if model_manager::is_model_ready(spec) {
            (model_manager::model_path(spec), model_manager::tokenizer_path(spec))
        } else if std::env::var("RAGREPO_SKIP_MODEL_DOWNLOAD").is_ok() {
            return Err(RagError::ModelUnavailable(format!(
                "model {} not cached and RAGREPO_SKIP_MODEL_DOWNLOAD is set",
                spec.name
            )));
        } else {
            model_manager::ensure_model(spec).map_err(|e| {
                RagError::ModelUnavailable(format!("failed to download model {}: {e}", spec.name))
            })?
        };

        let session = Session::builder()
            .map_err(|e| RagError::ModelUnavailable(format!("failed to create ONNX session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| RagError::ModelUnavailable(format!("failed to load embedding model: {e}")))?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| RagError::ModelUnavailable(format!("failed to load tokenizer: {e}")))?;

        tracing::info!(model = spec.name, path = %model_path.display(), "loaded ONNX embedding model");

        Ok(Self {
            spec,
            batch_size: config.batch_size,
            session: std::sync::Mutex::new(session),
            tokenizer,
        })
    }

    /// Returns the embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.spec.dimensions
    }

    /// Embed a single text string.
    ///
    /// Batching is a performance concern only: `embed_single(x)` always
    /// equals the `x`-th row of `embed_batch` called with any superset of
    /// inputs containing `x` (spec §4.5).
    pub fn embed_single(&self, text: &str) -> RagResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text])?;
        results.pop().ok_or_else(|| RagError::Internal("embed_batch returned no rows".into()))
    }

    /// Embed a batch of strings, internally chunked by the configured batch size.
    pub fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut session =
            self.session.lock().map_err(|_| RagError::Internal("embedder session lock poisoned".into()))?;

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.run_inference(&mut session, batch)?;
            all.extend(embeddings);
        }
        Ok(all)
    }

    fn run_inference(&self, session: &mut Session, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        let batch_size = texts.len();
        let max_len = self.spec.max_seq_length;

        let (input_ids, attention_mask, token_type_ids) = self.tokenize_batch(texts, max_len)?;

        let shape = vec![batch_size as i64, max_len as i64];

        let ids_value = ort::value::Tensor::from_array((shape.clone(), input_ids))
            .map_err(|e| RagError::Internal(format!("ONNX tensor error: {e}")))?;
        let mask_value = ort::value::Tensor::from_array((shape.clone(), attention_mask.clone()))
            .map_err(|e| RagError::Internal(format!("ONNX tensor error: {e}")))?;

        use std::borrow::Cow;
        let mut inputs: Vec<(Cow<'_, str>, ort::session::SessionInputValue<'_>)> = vec![
            (Cow::Borrowed("input_ids"), ort::session::SessionInputValue::from(ids_value)),
            (Cow::Borrowed("attention_mask"), ort::session::SessionInputValue::from(mask_value)),
        ];

        let expects_token_type = session.inputs().iter().any(|i| i.name() == "token_type_ids");
        if expects_token_type {
            let type_value = ort::value::Tensor::from_array((shape.clone(), token_type_ids))
                .map_err(|e| RagError::Internal(format!("ONNX tensor error (token_type_ids): {e}")))?;
            inputs.push((Cow::Borrowed("token_type_ids"), ort::session::SessionInputValue::from(type_value)));
        }

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| RagError::Internal("model has no outputs".into()))?;

        let outputs = session.run(inputs).map_err(|e| RagError::Internal(format!("ONNX inference error: {e}")))?;

        let output_value =
            outputs.get(&output_name).ok_or_else(|| RagError::Internal("no output tensor found".into()))?;

        let (output_shape, output_data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Internal(format!("output extraction error: {e}")))?;

        let dims: Vec<usize> = output_shape.iter().map(|&d| d as usize).collect();
        let mut embeddings = Vec::with_capacity(batch_size);

        if dims.len() == 3 {
            // [batch, seq_len, hidden_dim] -> mean pool with attention mask
            let seq_len = dims[1];
            let hidden_dim = dims[2];

            for b in 0..batch_size {
                let mut pooled = vec![0.0f32; hidden_dim];
                let mut mask_sum = 0.0f32;

                for s in 0..seq_len {
                    let mask_val = attention_mask[b * max_len + s] as f32;
                    mask_sum += mask_val;
                    let offset = b * seq_len * hidden_dim + s * hidden_dim;
                    for d in 0..hidden_dim {
                        pooled[d] += output_data[offset + d] * mask_val;
                    }
                }

                if mask_sum > 0.0 {
                    for d in &mut pooled {
                        *d /= mask_sum;
                    }
                }

                crate::vector::l2_normalize(&mut pooled);
                embeddings.push(pooled);
            }
        } else if dims.len() == 2 {
            let hidden_dim = dims[1];
            for b in 0..batch_size {
                let offset = b * hidden_dim;
                let mut v = output_data[offset..offset + hidden_dim].to_vec();
                crate::vector::l2_normalize(&mut v);
                embeddings.push(v);
            }
        } else {
            return Err(RagError::Internal(format!("unexpected output tensor shape: {dims:?}")));
        }

        Ok(embeddings)
    }

    fn tokenize_batch(&self, texts: &[&str], max_len: usize) -> RagResult<(Vec<i64>, Vec<i64>, Vec<i64>)> {
        let mut all_input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut all_attention_mask = Vec::with_capacity(texts.len() * max_len);
        let mut all_token_type_ids = Vec::with_capacity(texts.len() * max_len);

        for text in texts {
            let encoding = self
                .tokenizer
                .encode(*text, true)
                .map_err(|e| RagError::Internal(format!("tokenization error: {e}")))?;

            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let actual_len = ids.len().min(max_len);

            for i in 0..actual_len {
                all_input_ids.push(ids[i] as i64);
                all_attention_mask.push(mask[i] as i64);
                all_token_type_ids.push(type_ids[i] as i64);
            }

            for _ in actual_len..max_len {
                all_input_ids.push(0);
                all_attention_mask.push(0);
                all_token_type_ids.push(0);
            }
        }

        Ok((all_input_ids, all_attention_mask, all_token_type_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fails_cleanly_when_download_disabled_and_uncached() {
        std::env::set_var("RAGREPO_SKIP_MODEL_DOWNLOAD", "1");
        let config = EmbeddingConfig { model_name: "non-existent-spec-xyz".to_string(), batch_size: 8 };
        let result = Embedder::new(&config);
        std::env::remove_var("RAGREPO_SKIP_MODEL_DOWNLOAD");
        assert!(matches!(result, Err(RagError::ModelUnavailable(_))));
    }
}
