pub mod chunking;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod retriever;

#[cfg(test)]
mod testing;

pub use error::{RagError, Result};
