//! One-shot generation of whole record batches.
//!
//! Unlike completion, which fills placeholders one record at a time,
//! generation asks the endpoint for `n` full records in a single call,
//! driven by a per-entity prompt pair from the prompt library. Every
//! element of the reply goes through typed construction and validation,
//! then ids are reassigned from the stored table's maximum so appended
//! batches never collide.

use serde_json::Value;
use tracing::info;

use crate::error::{LlmError, PipelineError};
use crate::llm::{extract_json, ChatMessage, CompletionProvider, CompletionRequest};
use crate::prompts::build_generation_prompt;
use crate::schema::{EntityKind, EntityRecord};
use crate::store::RecordStore;

use super::completion::ForgePipeline;

impl<P: CompletionProvider> ForgePipeline<P> {
    /// Generates `n` full records for an entity in one endpoint call.
    ///
    /// Requires a generation prompt pair configured for the entity; `{n}`
    /// in the user prompt is replaced with the batch size. Ids in the
    /// reply are discarded and reassigned sequentially after the highest
    /// id already stored. The batch is returned but not persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCount` for a negative `n` and `MissingPrompt` when
    /// the entity has no configured generation prompt. A reply element
    /// that fails schema validation fails the whole batch.
    pub async fn generate_batch(
        &self,
        kind: EntityKind,
        n: i64,
    ) -> Result<Vec<EntityRecord>, PipelineError> {
        if n < 0 {
            return Err(PipelineError::InvalidCount(n));
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let configured = self
            .prompts()
            .generation_prompt(kind)
            .ok_or_else(|| PipelineError::MissingPrompt(kind.as_str().to_string()))?;
        let prompt = build_generation_prompt(configured, n);
        let descriptor = kind.descriptor();

        let mut request = CompletionRequest::new(
            &self.config().model,
            vec![
                ChatMessage::system(prompt.system),
                ChatMessage::user(prompt.user),
            ],
        )
        .with_temperature(self.config().temperature)
        .with_json_schema(
            format!("{}_batch", descriptor.name),
            descriptor.batch_json_schema(),
        );
        if let Some(max_tokens) = self.config().max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.provider().complete(request).await?;
        let content = response.first_content().ok_or(LlmError::EmptyResponse)?;
        let payload = extract_json(content)?;

        let existing = self.store().read_records_or_default(kind).await?;
        let start_id = RecordStore::max_id(&existing) + 1;

        let mut records = Vec::new();
        for (offset, item) in response_records(payload).into_iter().enumerate() {
            let mut record = EntityRecord::from_value(kind, item)?;
            record.set_id(start_id + offset as i64);
            records.push(record);
        }

        info!(
            entity = %kind,
            requested = n,
            generated = records.len(),
            "generated record batch"
        );
        Ok(records)
    }

    /// Appends generated records to the stored table. Returns the table's
    /// new total.
    pub async fn persist_generated(
        &self,
        kind: EntityKind,
        records: &[EntityRecord],
    ) -> Result<usize, PipelineError> {
        let mut values = Vec::with_capacity(records.len());
        for record in records {
            values.push(record.to_value()?);
        }
        let total = self.store().append_records(kind, &values).await?;
        Ok(total)
    }
}

/// Unwraps a generation reply into record candidates: a `records`
/// envelope or a bare array yields its elements, a bare object is a
/// batch of one.
fn response_records(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            Some(single) => vec![single],
            None => vec![Value::Object(map)],
        },
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::llm::{Choice, CompletionResponse, Usage};
    use crate::pipeline::ForgeConfig;
    use crate::prompts::{GenerationPrompt, PromptLibrary};

    struct FixedProvider {
        reply: String,
    }

    impl FixedProvider {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                id: "cmpl-test".to_string(),
                model: "mock".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: ChatMessage::assistant(self.reply.clone()),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage {
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    total_tokens: 0,
                },
            })
        }
    }

    fn hotel_prompts() -> PromptLibrary {
        PromptLibrary::new().with_generation_prompt(
            EntityKind::Hotel,
            GenerationPrompt::new("You generate hotels.", "Generate {n} hotels."),
        )
    }

    fn pipeline_with(
        temp_dir: &TempDir,
        prompts: PromptLibrary,
        reply: &str,
    ) -> ForgePipeline<FixedProvider> {
        let config = ForgeConfig::default().with_data_dir(temp_dir.path());
        ForgePipeline::with_library(config, prompts, FixedProvider::new(reply))
    }

    #[tokio::test]
    async fn test_generate_batch_missing_prompt_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pipeline = pipeline_with(&temp_dir, PromptLibrary::new(), "{}");
        let result = pipeline.generate_batch(EntityKind::Hotel, 2).await;
        assert!(matches!(result, Err(PipelineError::MissingPrompt(name)) if name == "hotel"));
    }

    #[tokio::test]
    async fn test_generate_batch_negative_count_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pipeline = pipeline_with(&temp_dir, hotel_prompts(), "{}");
        let result = pipeline.generate_batch(EntityKind::Hotel, -3).await;
        assert!(matches!(result, Err(PipelineError::InvalidCount(-3))));
    }

    #[tokio::test]
    async fn test_generate_batch_zero_count_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pipeline = pipeline_with(&temp_dir, hotel_prompts(), "ignored");
        let records = pipeline
            .generate_batch(EntityKind::Hotel, 0)
            .await
            .expect("Zero-count generation should succeed");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_generate_batch_reassigns_ids_after_stored_maximum() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Hotel,
                &[json!({"id": 5, "name": "Le Vieux Port", "address": "2 rue des Quais", "tag": "beach"})],
            )
            .await
            .expect("Write should succeed");

        let reply = r#"{"records": [
            {"id": 1, "name": "Aurora Lodge", "address": "14 Fjellveien", "tag": "mountain"},
            {"id": 2, "name": "Hotel Central", "address": "3 place Neuve", "tag": "city"}
        ]}"#;
        let pipeline = pipeline_with(&temp_dir, hotel_prompts(), reply);
        let records = pipeline
            .generate_batch(EntityKind::Hotel, 2)
            .await
            .expect("Generation should succeed");

        let ids: Vec<i64> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![6, 7]);
    }

    #[tokio::test]
    async fn test_generate_batch_accepts_bare_object_as_singleton() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reply = r#"{"id": 9, "name": "La Bergerie", "address": "7 chemin des Alpages", "tag": "countryside"}"#;
        let pipeline = pipeline_with(&temp_dir, hotel_prompts(), reply);
        let records = pipeline
            .generate_batch(EntityKind::Hotel, 1)
            .await
            .expect("Generation should succeed");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), 1);
    }

    #[tokio::test]
    async fn test_generate_batch_invalid_element_fails_whole_batch() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prompts = PromptLibrary::new().with_generation_prompt(
            EntityKind::Room,
            GenerationPrompt::new("You generate rooms.", "Generate {n} rooms."),
        );
        let reply = r#"{"records": [
            {"id": 1, "hotel_id": 1, "price": 80.0, "capacity": 2},
            {"id": 2, "hotel_id": 1, "price": 90.0, "capacity": 0}
        ]}"#;
        let pipeline = pipeline_with(&temp_dir, prompts, reply);
        let result = pipeline.generate_batch(EntityKind::Room, 2).await;
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[tokio::test]
    async fn test_persist_generated_appends_to_table() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Hotel,
                &[json!({"id": 1, "name": "Hotel du Lac", "address": "1 quai Perdonnet", "tag": "city"})],
            )
            .await
            .expect("Write should succeed");

        let reply = r#"{"records": [
            {"id": 1, "name": "Aurora Lodge", "address": "14 Fjellveien", "tag": "mountain"}
        ]}"#;
        let pipeline = pipeline_with(&temp_dir, hotel_prompts(), reply);
        let records = pipeline
            .generate_batch(EntityKind::Hotel, 1)
            .await
            .expect("Generation should succeed");
        let total = pipeline
            .persist_generated(EntityKind::Hotel, &records)
            .await
            .expect("Persist should succeed");

        assert_eq!(total, 2);
        let stored = store
            .read_records(EntityKind::Hotel)
            .await
            .expect("Read should succeed");
        assert_eq!(stored.len(), 2);
        assert_eq!(RecordStore::max_id(&stored), 2);
    }

    #[test]
    fn test_response_records_shapes() {
        let array = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(response_records(array).len(), 2);

        let envelope = json!({"records": [{"id": 1}]});
        assert_eq!(response_records(envelope).len(), 1);

        let object = json!({"id": 4, "name": "x"});
        let singleton = response_records(object);
        assert_eq!(singleton.len(), 1);
        assert_eq!(singleton[0]["id"], json!(4));
    }
}
