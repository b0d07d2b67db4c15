//! Deterministic stand-ins for the external services, used by unit tests.

use crate::database::{ScoredResult, VectorRecord, VectorStore};
use crate::embeddings::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::ChatModel;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Letter-frequency vectors: texts sharing letters land close together.
#[derive(Default)]
pub struct LetterEmbedder {
    pub query_calls: Mutex<usize>,
    pub document_calls: Mutex<usize>,
    pub fail: bool,
}

impl LetterEmbedder {
    pub fn failing() -> Self {
        LetterEmbedder {
            fail: true,
            ..Default::default()
        }
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 27];
        for c in text.to_lowercase().chars() {
            match c {
                'a'..='z' => vector[(c as u8 - b'a') as usize] += 1.0,
                _ => vector[26] += 0.01,
            }
        }
        vector
    }

    pub fn query_calls(&self) -> usize {
        *self.query_calls.lock().unwrap()
    }

    pub fn document_calls(&self) -> usize {
        *self.document_calls.lock().unwrap()
    }
}

impl EmbeddingProvider for LetterEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.document_calls.lock().unwrap() += 1;
        if self.fail {
            return Err(RagError::upstream("embeddings", "service unavailable"));
        }
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        *self.query_calls.lock().unwrap() += 1;
        Ok(Self::vectorize(text))
    }
}

/// Brute-force cosine-distance store keyed by collection, then id.
#[derive(Default)]
pub struct InMemoryStore {
    pub collections: Mutex<BTreeMap<String, BTreeMap<String, VectorRecord>>>,
    pub upsert_calls: Mutex<usize>,
}

impl InMemoryStore {
    pub fn ids(&self, collection: &str) -> Vec<String> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn record(&self, collection: &str, id: &str) -> Option<VectorRecord> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|records| records.get(id).cloned())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b)) as f64
}

impl VectorStore for InMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.lock().unwrap().contains_key(collection))
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections.lock().unwrap().remove(collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        *self.upsert_calls.lock().unwrap() += 1;
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection.to_string()).or_default();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn similarity_search_with_score(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let collections = self.collections.lock().unwrap();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<ScoredResult> = records
            .values()
            .map(|record| ScoredResult {
                id: record.id.clone(),
                chunk: record.chunk.clone(),
                score: cosine_distance(&record.embedding, embedding),
            })
            .collect();
        results.sort_by(|a, b| a.score.total_cmp(&b.score));
        results.truncate(k);
        Ok(results)
    }
}

/// Records every prompt and replies with a fixed answer.
pub struct ScriptedModel {
    pub reply: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        ScriptedModel {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        ScriptedModel {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .map_err(|message| RagError::upstream("chat completion", message))
    }
}
