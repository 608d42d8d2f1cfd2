//! Error types for bookforge operations.
//!
//! Defines error types for all major subsystems:
//! - Schema construction and validation
//! - Record store persistence
//! - LLM API interactions
//! - Pipeline orchestration (placeholder generation, completion, batches)

use thiserror::Error;

/// Errors raised when a record violates its entity schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Invalid value for field '{field}' of {entity}: {reason}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("Tag '{value}' is not in the allowed set for {entity}.{field}")]
    InvalidTag {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Record payload for {entity} is malformed: {source}")]
    MalformedPayload {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record file not found: {0}")]
    NotFound(String),

    #[error("Invalid record file '{path}': {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("Failed to create data directory '{0}'")]
    DirectoryCreationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Empty completion: the model returned no choices")]
    EmptyResponse,

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while driving the generation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid record count {0}: must be non-negative")]
    InvalidCount(i64),

    #[error("No {entity} record with id {id}")]
    RecordNotFound { entity: &'static str, id: i64 },

    #[error("No generation prompt configured for entity '{0}'")]
    MissingPrompt(String),

    #[error(transparent)]
    Config(#[from] crate::pipeline::ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
