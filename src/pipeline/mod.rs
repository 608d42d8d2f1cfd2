//! Pipeline orchestration for the record forge.
//!
//! This module drives the three ways records come into existence:
//!
//! - **Placeholders**: partial records with sequential ids, concrete tags
//!   and sentinel values, generated locally without any endpoint call
//! - **Completion**: placeholder records sent to the LLM endpoint one at a
//!   time, with context tables, and validated on the way back
//! - **Generation**: whole batches of full records from a single endpoint
//!   call, driven by per-entity prompt pairs
//!
//! # Pipeline Flow
//!
//! 1. **Seed**: placeholder records are appended to an entity's table
//! 2. **Complete**: every pending record in the table is completed with
//!    bounded concurrency; failures are reported, not fatal
//! 3. **Persist**: completed records are merged back over their
//!    placeholder rows
//!
//! # Example
//!
//! ```rust,ignore
//! use bookforge::llm::OpenAiClient;
//! use bookforge::pipeline::{ForgeConfig, ForgePipeline, PlaceholderGenerator};
//! use bookforge::schema::EntityKind;
//!
//! // Seed three placeholder hotels
//! let config = ForgeConfig::new().with_data_dir("./data");
//! let generator = PlaceholderGenerator::new().with_seed(7);
//! let store = bookforge::store::RecordStore::new(&config.data_dir);
//! let existing = store.read_records_or_default(EntityKind::Hotel).await?;
//! let batch = generator.generate(EntityKind::Hotel, 3, &existing)?;
//! store.append_records(EntityKind::Hotel, &batch).await?;
//!
//! // Complete the stored table and persist the results
//! let client = OpenAiClient::from_env()?;
//! let pipeline = ForgePipeline::new(config, client).await?;
//! let outcome = pipeline.complete_batch(EntityKind::Hotel).await?;
//! pipeline
//!     .persist_completed(EntityKind::Hotel, &outcome.completed)
//!     .await?;
//! ```
//!
//! # Configuration
//!
//! The pipeline is configured via the `ForgeConfig` struct or environment
//! variables:
//!
//! ```rust,ignore
//! // Via builder pattern
//! let config = ForgeConfig::new()
//!     .with_data_dir("./data")
//!     .with_model("gpt-4o-mini")
//!     .with_max_concurrent_completions(8);
//!
//! // Via environment variables
//! let config = ForgeConfig::from_env()?;
//! ```

pub mod completion;
pub mod config;
pub mod generation;
pub mod placeholders;

// Re-export main types for convenience
pub use completion::{BatchOutcome, ForgePipeline};
pub use config::{ConfigError, ForgeConfig};
pub use placeholders::PlaceholderGenerator;
