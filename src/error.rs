//! Error types for the PDF question-answering pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting a document or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required environment variable is unset or empty.
    #[error("Environment variable {var} is not set. Check your .env file")]
    Configuration {
        /// Name of the missing variable.
        var: String,
    },

    /// The source document does not exist.
    #[error("PDF file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Splitting produced nothing to store. Callers treat this as a clean stop.
    #[error("No chunks were created from {}. Check the PDF content", path.display())]
    NoChunks { path: PathBuf },

    /// The source document exists but could not be read.
    #[error("Failed to load document {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    /// A call to the embedding provider, vector store or language model failed.
    #[error("{service} call failed: {message}")]
    Upstream {
        /// The external service that produced the error.
        service: &'static str,
        /// A description of the failure.
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn upstream(service: &'static str, message: impl ToString) -> Self {
        RagError::Upstream {
            service,
            message: message.to_string(),
        }
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
