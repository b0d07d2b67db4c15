use crate::config::OpenAIConfig;
use crate::error::{RagError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Inputs sent per embeddings request
const EMBEDDING_BATCH_SIZE: usize = 100;

/// Turns text into fixed-length vectors.
///
/// The same provider (and model) must be used for ingestion and for queries,
/// otherwise stored and query vectors are not comparable.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider {
    /// Embed a batch of chunk texts, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for the OpenAI embeddings API
#[derive(Clone)]
pub struct OpenAIEmbeddings {
    config: OpenAIConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbeddings {
    pub fn new(config: OpenAIConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAIEmbeddings { config, client }
    }

    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let url = format!("{}/embeddings", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::upstream("embeddings", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::upstream(
                "embeddings",
                format!("API request failed: {} {}", status, error_text),
            ));
        }

        let mut response_data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::upstream("embeddings", e))?;

        if response_data.data.len() != texts.len() {
            return Err(RagError::upstream(
                "embeddings",
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response_data.data.len()
                ),
            ));
        }

        response_data.data.sort_by_key(|d| d.index);
        Ok(response_data.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            debug!(
                "Embedding batch of {} texts with {}",
                batch.len(),
                self.config.embedding_model
            );
            embeddings.extend(self.embed_batch(batch).await?);
        }

        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::upstream("embeddings", "no embedding returned for query"))
    }
}
