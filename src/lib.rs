//! bookforge: synthetic hotel-booking dataset generator.
//!
//! This library seeds placeholder records for a fixed booking schema,
//! completes them through an OpenAI-compatible chat endpoint, generates
//! whole batches from configured prompts, and audits the resulting store.

// Core modules
pub mod audit;
pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod store;

// Re-export commonly used error types
pub use error::{LlmError, PipelineError, SchemaError, StoreError};
