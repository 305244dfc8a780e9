//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document (or the document directory) could not be loaded
    #[error("Failed to load document '{path}': {message}")]
    DocumentLoad { path: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector store error
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Chat completion error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval found nothing usable to ground an answer
    #[error("No relevant documents found: {0}")]
    NoRelevantDocuments(String),

    /// Invalid request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document load error
    pub fn document_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector store error
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Status code and machine-readable category for the HTTP surface
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NoRelevantDocuments(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::DocumentLoad { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "document_error"),
            Error::UnsupportedFileType(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_type"),
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::VectorStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_store_error"),
            Error::Llm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "llm_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error_type, "{}", message);
        } else {
            tracing::info!(error_type, "{}", message);
        }

        let body = Json(json!({
            "detail": message,
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::NoRelevantDocuments("empty index".into()).status_and_type().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::validation("question must not be empty").status_and_type().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::llm("upstream 429").status_and_type().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::embedding("timeout").status_and_type().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_types_per_failure_class() {
        let cases = [
            (Error::config("missing OPENAI_API_KEY"), "config_error"),
            (Error::document_load("a.txt", "empty"), "document_error"),
            (Error::UnsupportedFileType("docx".into()), "unsupported_type"),
            (Error::embedding("timeout"), "embedding_error"),
            (Error::vector_store("dimension mismatch"), "vector_store_error"),
            (Error::llm("upstream 429"), "llm_error"),
            (Error::internal("join failed"), "internal_error"),
        ];
        for (err, expected) in cases {
            let (status, error_type) = err.status_and_type();
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(error_type, expected);
        }
    }

    #[test]
    fn test_document_load_message() {
        let err = Error::document_load("data/notes.txt", "invalid UTF-8");
        assert_eq!(
            err.to_string(),
            "Failed to load document 'data/notes.txt': invalid UTF-8"
        );
    }
}
