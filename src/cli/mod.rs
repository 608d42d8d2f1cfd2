//! Command-line interface for bookforge.
//!
//! Provides commands for seeding placeholder records, completing them
//! through an LLM endpoint, generating whole batches and auditing the store.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
