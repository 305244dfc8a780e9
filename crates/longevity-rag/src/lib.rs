//! longevity-rag: retrieval-augmented nutrition Q&A backend
//!
//! Documents (PDF and plain text) are chunked, embedded and stored in a vector
//! index by the [`ingestion::Indexer`]. Questions are answered by the
//! [`generation::AnswerComposer`], which retrieves the closest chunks and asks
//! a chat model to answer only from them, optionally personalised with a
//! [`types::UserProfile`]. The [`server`] module exposes both over HTTP.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, FileType},
    query::{AskRequest, UserProfile},
    response::AskResponse,
};
