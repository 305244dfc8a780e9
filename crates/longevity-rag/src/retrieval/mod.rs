//! Retrieval of context passages for a question

mod search;

pub use search::{RetrievedPassage, Retriever};
