//! adforge: marketing-content generation pipeline.
//!
//! This library drives a multi-stage LLM generation pipeline from a product
//! description to ad scripts: avatar analysis, customer journey, objections,
//! marketing angles, hooks, and scripts. Each stage's output becomes prompt
//! context for the next. Free-text LLM responses are normalized into
//! parseable JSON, typed per stage, and persisted per campaign; the flat
//! script output is restructured into a nested angle → hook → script tree.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod restructure;
pub mod storage;
pub mod utils;

// Re-export commonly used error types
pub use error::{CompletionError, GenerationError, GenerationResult, TemplateError};
