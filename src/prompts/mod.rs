//! Prompt configuration and builders for record completion and generation.
//!
//! Three optional JSON documents configure the prompts:
//!
//! - instructions: entity name -> extra instruction text appended to the
//!   completion prompt. Missing entries degrade to an empty string.
//! - associations: entity name -> list of entity names whose tables are
//!   loaded as context before completion. Missing entries degrade to an
//!   empty list.
//! - generation prompts: entity name -> `{system, user}` pair driving the
//!   full-batch generation flow. This lookup is strict; generating without
//!   a configured prompt is an error in the pipeline.
//!
//! A missing file behaves like an empty document. Malformed JSON fails.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use crate::error::StoreError;
use crate::schema::{EntityKind, DATE_SENTINEL, TEXT_SENTINEL};

/// Fixed directive for the completion endpoint. Placeholder markers are
/// substituted in so the directive always matches the registry's sentinels.
const COMPLETION_BASE_SYSTEM: &str = r#"You complete partially generated records for a hotel-booking dataset.

Rules:
1. Preserve every field that already carries a real value, exactly as given.
2. Fill in only placeholder fields. Placeholder markers are: the text "{text_marker}", the number 0 (integers and prices), and the date "{date_marker}".
3. Generated values must be plausible and consistent with the fields already present and with the related records provided as context.
4. Reply with a single JSON object matching the requested schema, and nothing else."#;

/// Prompt pair for one entity's full-batch generation.
///
/// The user prompt may contain `{n}`, replaced with the batch size at build
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPrompt {
    /// System prompt establishing the generator's role.
    pub system: String,
    /// User prompt with the specific generation request.
    pub user: String,
}

impl GenerationPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Prompt pair for completing one placeholder record.
#[derive(Debug, Clone)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
}

/// Loaded prompt configuration for all entities.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    instructions: HashMap<String, String>,
    associations: HashMap<String, Vec<EntityKind>>,
    generation: HashMap<String, GenerationPrompt>,
}

impl PromptLibrary {
    /// An empty library: every completion lookup degrades to its default
    /// and no generation prompts are configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the library from up to three JSON files.
    ///
    /// A `None` path or an absent file contributes an empty document;
    /// malformed content fails with `InvalidFormat`.
    pub async fn load(
        instructions_path: Option<&Path>,
        associations_path: Option<&Path>,
        generation_path: Option<&Path>,
    ) -> Result<Self, StoreError> {
        let instructions: HashMap<String, String> =
            load_json_document(instructions_path).await?.unwrap_or_default();

        let raw_associations: HashMap<String, Vec<String>> =
            load_json_document(associations_path).await?.unwrap_or_default();
        let mut associations = HashMap::new();
        for (entity, related) in raw_associations {
            let mut kinds = Vec::new();
            for name in related {
                match name.parse::<EntityKind>() {
                    Ok(kind) => kinds.push(kind),
                    Err(_) => {
                        warn!(entity = %entity, related = %name, "skipping unknown association entry");
                    }
                }
            }
            associations.insert(entity, kinds);
        }

        let generation: HashMap<String, GenerationPrompt> =
            load_json_document(generation_path).await?.unwrap_or_default();

        Ok(Self {
            instructions,
            associations,
            generation,
        })
    }

    /// Sets the completion instruction for an entity.
    pub fn with_instruction(mut self, kind: EntityKind, text: impl Into<String>) -> Self {
        self.instructions.insert(kind.as_str().to_string(), text.into());
        self
    }

    /// Sets the context associations for an entity.
    pub fn with_association(mut self, kind: EntityKind, related: Vec<EntityKind>) -> Self {
        self.associations.insert(kind.as_str().to_string(), related);
        self
    }

    /// Sets the generation prompt pair for an entity.
    pub fn with_generation_prompt(mut self, kind: EntityKind, prompt: GenerationPrompt) -> Self {
        self.generation.insert(kind.as_str().to_string(), prompt);
        self
    }

    /// Extra completion instruction for an entity. Missing entries yield
    /// an empty string.
    pub fn instruction(&self, kind: EntityKind) -> &str {
        self.instructions
            .get(kind.as_str())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Entities whose tables provide completion context. Missing entries
    /// yield an empty list.
    pub fn associations(&self, kind: EntityKind) -> &[EntityKind] {
        self.associations
            .get(kind.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Generation prompt for an entity, or `None` when absent or blank.
    /// The pipeline treats `None` as a hard error for the generation flow.
    pub fn generation_prompt(&self, kind: EntityKind) -> Option<&GenerationPrompt> {
        self.generation
            .get(kind.as_str())
            .filter(|prompt| !prompt.system.trim().is_empty() && !prompt.user.trim().is_empty())
    }
}

async fn load_json_document<T>(path: Option<&Path>) -> Result<Option<T>, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).await?;
    let document = serde_json::from_str(&contents).map_err(|e| StoreError::InvalidFormat {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(document))
}

/// Builds the prompt pair for completing one placeholder record.
///
/// The user prompt carries the record as pretty JSON, one section per
/// associated context table, and the per-entity instruction when present.
pub fn build_completion_prompt(
    kind: EntityKind,
    record: &Value,
    context: &[(EntityKind, Vec<Value>)],
    instruction: &str,
) -> CompletionPrompt {
    let system = COMPLETION_BASE_SYSTEM
        .replace("{text_marker}", TEXT_SENTINEL)
        .replace("{date_marker}", DATE_SENTINEL);

    let mut user = format!(
        "Complete this {} record:\n\n{}",
        kind,
        pretty_json(record)
    );

    if !context.is_empty() {
        user.push_str("\n\nRelated records for context:");
        for (related, records) in context {
            user.push_str(&format!(
                "\n\n## {}\n{}",
                related,
                pretty_json(&Value::Array(records.clone()))
            ));
        }
    }

    if !instruction.is_empty() {
        user.push_str(&format!("\n\nAdditional guidance: {}", instruction));
    }

    CompletionPrompt { system, user }
}

/// Builds the prompt pair for a full generation batch, substituting `{n}`
/// with the batch size.
pub fn build_generation_prompt(prompt: &GenerationPrompt, n: i64) -> GenerationPrompt {
    GenerationPrompt {
        system: prompt.system.clone(),
        user: prompt.user.replace("{n}", &n.to_string()),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
