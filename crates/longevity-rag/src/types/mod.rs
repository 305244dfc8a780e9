//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType};
pub use query::{AskRequest, UserProfile};
pub use response::{AskResponse, HealthResponse};
