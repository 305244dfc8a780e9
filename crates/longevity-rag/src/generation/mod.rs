//! Answer generation from retrieved context

pub mod composer;
pub mod prompt;

pub use composer::{Answer, AnswerComposer};
pub use prompt::{PromptBuilder, CONTEXT_SEPARATOR};
