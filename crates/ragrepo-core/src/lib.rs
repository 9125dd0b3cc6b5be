//! # ragrepo-core
//!
//! RAG indexing and retrieval engine for code-forge repositories.
//!
//! This crate provides the foundational components for a retrieval-augmented
//! question-answering service over a remote GitHub-style repository: fetch
//! its text files, chunk and embed them, persist the vectors behind a
//! capacity-aware two-collection store, and serve two-stage
//! file-narrow-then-chunk-select retrieval with line-precise citations. It
//! is designed as a library with clear module boundaries so each subsystem
//! can be developed and tested independently of any HTTP framing.
//!
//! ## Architecture
//!
//! - **`config`** -- environment-driven configuration resolution
//! - **`error`** -- the `RagError` taxonomy and its HTTP mapping
//! - **`types`** -- domain types shared across every subsystem
//! - **`identity`** -- deterministic SHA-1 IDs for files and chunks
//! - **`filter`** -- text/code path filtering
//! - **`forge`** -- code-forge client (tree listing, raw fetch, README)
//! - **`chunker`** -- line-aware overlapping chunking
//! - **`embedder`** -- ONNX-based local embedding inference
//! - **`vector`** -- Qdrant-backed two-collection vector store adapter
//! - **`indexer`** -- orchestrates forge + filter + chunker + embedder + vector store
//! - **`retriever`** -- two-stage hierarchical retrieval
//! - **`answer`** -- numbered-context answer and summary composition
//! - **`facade`** -- the single entry point wired into `ragrepo-service` / `ragrepo-cli`
//!
//! Each module exposes a small, pure-where-possible surface; the facade
//! wires them together for callers.

// Workspace lints are inherited from Cargo.toml

pub mod config;
pub mod error;
pub mod types;

pub mod identity;
pub mod filter;
pub mod forge;
pub mod chunker;
pub mod embedder;
pub mod vector;
pub mod indexer;
pub mod retriever;
pub mod answer;
pub mod facade;

/// Re-export the primary engine interface.
pub use config::Config;
pub use error::{RagError, RagResult};
pub use facade::Facade;
