use crate::database::{ScoredResult, VectorStore};
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use log::debug;

/// Neighbours fetched for every question. No score cutoff is applied, so weak
/// matches on a sparse collection are still returned.
pub const TOP_K: usize = 10;

/// Similarity search over one collection
pub struct Retriever<E, S> {
    embedder: E,
    store: S,
    collection: String,
}

impl<E, S> Retriever<E, S>
where
    E: EmbeddingProvider,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S, collection: impl Into<String>) -> Self {
        Retriever {
            embedder,
            store,
            collection: collection.into(),
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// The `TOP_K` closest chunks to `query`, closest first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredResult>> {
        let embedding = self.embedder.embed_query(query).await?;

        let results = self
            .store
            .similarity_search_with_score(&self.collection, &embedding, TOP_K)
            .await?;

        debug!(
            "Retrieved {} chunks from {} (best distance: {:?})",
            results.len(),
            self.collection,
            results.first().map(|r| r.score)
        );

        Ok(results)
    }
}
