//! Document ingestion: loading, chunking and batch indexing

mod chunker;
mod parser;
mod pipeline;

pub use chunker::{RecursiveChunker, TextSpan};
pub use parser::{DocumentLoader, FileParser, LoadedDocuments, SkippedDocument};
pub use pipeline::{
    BatchFailure, BatchOutcome, IndexerSettings, IngestReport, IngestStatus, Indexer,
};
