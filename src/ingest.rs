use crate::chunking::{TextChunk, TextSplitter};
use crate::database::{VectorRecord, VectorStore};
use crate::document::load_pages;
use crate::embeddings::EmbeddingProvider;
use crate::error::{RagError, Result};
use log::info;
use std::path::Path;

/// Primary key of the chunk at `index` in one ingestion run
pub fn chunk_id(index: usize) -> String {
    format!("doc-{}", index)
}

/// Load, chunk, embed and store a document in a collection
pub struct Ingestor<E, S> {
    embedder: E,
    store: S,
    splitter: TextSplitter,
    reset: bool,
}

impl<E, S> Ingestor<E, S>
where
    E: EmbeddingProvider,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S) -> Self {
        Ingestor {
            embedder,
            store,
            splitter: TextSplitter::default(),
            reset: false,
        }
    }

    /// Drop everything already in the collection before writing.
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest `pdf_path` into `collection` and return how many chunks were stored.
    ///
    /// Chunk ids run `doc-0..doc-(n-1)` over the whole document, so running
    /// this again on the same file replaces entries instead of duplicating them.
    /// Any failure aborts the run before the batch write.
    pub async fn ingest(&self, pdf_path: &Path, collection: &str) -> Result<usize> {
        info!("Loading PDF...");
        let pages = load_pages(pdf_path)?;
        info!("PDF loaded, {} pages", pages.len());

        info!("Splitting document into chunks...");
        let chunks = self.splitter.split_documents(&pages);
        if chunks.is_empty() {
            return Err(RagError::NoChunks {
                path: pdf_path.to_path_buf(),
            });
        }
        info!("Split into {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        info!("Generating embeddings for {} chunks...", texts.len());
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::upstream(
                "embeddings",
                format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            ));
        }

        let records = build_records(chunks, embeddings);

        if self.reset {
            info!("Resetting collection {}", collection);
            self.store.delete_collection(collection).await?;
        }

        info!("Saving {} chunks to collection {}...", records.len(), collection);
        self.store.create_collection(collection).await?;
        self.store.upsert(collection, &records).await?;

        Ok(records.len())
    }
}

fn build_records(chunks: Vec<TextChunk>, embeddings: Vec<Vec<f32>>) -> Vec<VectorRecord> {
    chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (chunk, embedding))| VectorRecord {
            id: chunk_id(index),
            chunk,
            embedding,
        })
        .collect()
}
