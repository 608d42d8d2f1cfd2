//! Concurrent completion of placeholder records.
//!
//! `ForgePipeline` wires the record store, the prompt library and a
//! completion provider together. Single records are completed on demand;
//! whole tables are completed with bounded concurrency, one provider call
//! per pending record.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{LlmError, PipelineError};
use crate::llm::{extract_json, ChatMessage, CompletionProvider, CompletionRequest};
use crate::prompts::{build_completion_prompt, PromptLibrary};
use crate::schema::{EntityKind, EntityRecord};
use crate::store::RecordStore;

use super::config::ForgeConfig;

/// Outcome of completing a stored table.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successfully completed records, sorted by id.
    pub completed: Vec<EntityRecord>,
    /// Ids whose completion failed, with the failure message.
    pub failed: Vec<(i64, String)>,
}

/// Pipeline driving record completion and generation against an LLM
/// endpoint.
pub struct ForgePipeline<P> {
    config: ForgeConfig,
    store: RecordStore,
    prompts: PromptLibrary,
    provider: P,
    semaphore: Arc<Semaphore>,
}

impl<P: CompletionProvider> ForgePipeline<P> {
    /// Creates a pipeline from configuration, loading the prompt library
    /// from the configured paths.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the configuration is invalid or a prompt
    /// configuration file is malformed.
    pub async fn new(config: ForgeConfig, provider: P) -> Result<Self, PipelineError> {
        config.validate()?;

        let prompts = PromptLibrary::load(
            config.instructions_path.as_deref(),
            config.associations_path.as_deref(),
            config.generation_prompts_path.as_deref(),
        )
        .await?;

        Ok(Self::with_library(config, prompts, provider))
    }

    /// Creates a pipeline with an already-built prompt library.
    pub fn with_library(config: ForgeConfig, prompts: PromptLibrary, provider: P) -> Self {
        let store = RecordStore::new(&config.data_dir);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_completions));
        Self {
            config,
            store,
            prompts,
            provider,
            semaphore,
        }
    }

    /// The pipeline's record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// The pipeline's prompt library.
    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub(super) fn provider(&self) -> &P {
        &self.provider
    }

    /// Completes one stored record through the endpoint.
    ///
    /// The record is located by id in the stored table, sent for completion
    /// with its context tables, and parsed back into a typed record. The
    /// returned record always carries the requested id, regardless of the
    /// id in the endpoint's payload.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` when the table holds no record with the
    /// requested id. Store, provider and schema failures propagate.
    pub async fn complete_record(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<EntityRecord, PipelineError> {
        let record = self
            .store
            .find_record(kind, id)
            .await?
            .ok_or(PipelineError::RecordNotFound {
                entity: kind.as_str(),
                id,
            })?;

        let context = self.load_context(kind).await?;
        self.complete_value(kind, id, &record, &context).await
    }

    /// Completes every pending record in the stored table.
    ///
    /// Records whose fields all carry real values are left untouched.
    /// Completions run concurrently up to the configured limit; one record
    /// failing does not stop the rest. The outcome lists completed records
    /// sorted by id and the ids that failed.
    pub async fn complete_batch(&self, kind: EntityKind) -> Result<BatchOutcome, PipelineError> {
        let records = self.store.read_records(kind).await?;
        let context = self.load_context(kind).await?;

        let mut pending: Vec<(i64, &Value)> = Vec::new();
        for record in &records {
            let Some(id) = RecordStore::record_id(record) else {
                warn!(entity = %kind, "skipping record without an integer id");
                continue;
            };
            if record_is_pending(kind, record) {
                pending.push((id, record));
            }
        }

        info!(
            entity = %kind,
            pending = pending.len(),
            total = records.len(),
            "completing stored table"
        );

        let context_ref = &context;
        let mut futures = Vec::with_capacity(pending.len());
        for &(id, record) in &pending {
            let semaphore = Arc::clone(&self.semaphore);
            futures.push(async move {
                let _permit = semaphore.acquire().await.unwrap();
                (id, self.complete_value(kind, id, record, context_ref).await)
            });
        }
        let results = futures::future::join_all(futures).await;

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(record) => completed.push(record),
                Err(error) => {
                    warn!(entity = %kind, id, error = %error, "record completion failed");
                    failed.push((id, error.to_string()));
                }
            }
        }
        completed.sort_by_key(|record| record.id());
        failed.sort_by_key(|(id, _)| *id);

        info!(
            entity = %kind,
            completed = completed.len(),
            failed = failed.len(),
            "table completion finished"
        );

        Ok(BatchOutcome { completed, failed })
    }

    /// Writes completed records back over the stored table.
    ///
    /// Each completed record replaces the stored row carrying its id;
    /// rows without a completed counterpart are kept as they are.
    pub async fn persist_completed(
        &self,
        kind: EntityKind,
        completed: &[EntityRecord],
    ) -> Result<PathBuf, PipelineError> {
        let mut records = self.store.read_records(kind).await?;
        for record in completed {
            let value = record.to_value()?;
            match records
                .iter_mut()
                .find(|stored| RecordStore::record_id(stored) == Some(record.id()))
            {
                Some(slot) => *slot = value,
                None => records.push(value),
            }
        }
        let path = self.store.write_records(kind, &records).await?;
        Ok(path)
    }

    /// Loads the context tables configured for an entity. Missing tables
    /// degrade to empty lists.
    pub(super) async fn load_context(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<(EntityKind, Vec<Value>)>, PipelineError> {
        let mut context = Vec::new();
        for &related in self.prompts.associations(kind) {
            let records = self.store.read_records_or_default(related).await?;
            if records.is_empty() {
                debug!(entity = %kind, related = %related, "context table empty or missing");
            }
            context.push((related, records));
        }
        Ok(context)
    }

    /// One provider round trip for a single record: prompt, call, extract,
    /// validate, re-pin the id.
    async fn complete_value(
        &self,
        kind: EntityKind,
        id: i64,
        record: &Value,
        context: &[(EntityKind, Vec<Value>)],
    ) -> Result<EntityRecord, PipelineError> {
        let prompt = build_completion_prompt(kind, record, context, self.prompts.instruction(kind));
        let descriptor = kind.descriptor();

        let mut request = CompletionRequest::new(
            &self.config.model,
            vec![
                ChatMessage::system(prompt.system),
                ChatMessage::user(prompt.user),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_json_schema(descriptor.name, descriptor.json_schema());
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.provider.complete(request).await?;
        let content = response.first_content().ok_or(LlmError::EmptyResponse)?;
        let payload = extract_json(content)?;

        let mut completed = EntityRecord::from_value(kind, payload)?;
        completed.set_id(id);
        Ok(completed)
    }
}

/// Whether a stored record still needs completion: any field carrying its
/// kind's placeholder marker, or missing entirely.
fn record_is_pending(kind: EntityKind, record: &Value) -> bool {
    let descriptor = kind.descriptor();
    descriptor
        .fields
        .iter()
        .any(|field| match record.get(field.name) {
            Some(value) => field.kind.is_placeholder(value),
            None => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::llm::{Choice, CompletionResponse, Usage};

    /// Provider that answers every call with the same canned reply.
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

    fn pipeline_with(temp_dir: &TempDir, reply: &str) -> ForgePipeline<FixedProvider> {
        let config = ForgeConfig::default().with_data_dir(temp_dir.path());
        ForgePipeline::with_library(config, PromptLibrary::new(), FixedProvider::new(reply))
    }

    #[tokio::test]
    async fn test_complete_record_repins_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 7, "hotel_id": 0, "price": 0.0, "capacity": 0})],
            )
            .await
            .expect("Write should succeed");

        let pipeline = pipeline_with(
            &temp_dir,
            r#"{"id": 3, "hotel_id": 1, "price": 120.0, "capacity": 2}"#,
        );
        let completed = pipeline
            .complete_record(EntityKind::Room, 7)
            .await
            .expect("Completion should succeed");

        assert_eq!(completed.id(), 7);
        match completed {
            EntityRecord::Room(room) => {
                assert_eq!(room.hotel_id, 1);
                assert!((room.price - 120.0).abs() < f64::EPSILON);
                assert_eq!(room.capacity, 2);
            }
            other => panic!("expected a room record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_record_unknown_id_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0})],
            )
            .await
            .expect("Write should succeed");

        let pipeline = pipeline_with(&temp_dir, "{}");
        let result = pipeline.complete_record(EntityKind::Room, 99).await;
        assert!(matches!(
            result,
            Err(PipelineError::RecordNotFound {
                entity: "room",
                id: 99
            })
        ));
    }

    #[tokio::test]
    async fn test_complete_record_missing_table_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pipeline = pipeline_with(&temp_dir, "{}");
        let result = pipeline.complete_record(EntityKind::Hotel, 1).await;
        assert!(matches!(
            result,
            Err(PipelineError::Store(crate::error::StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_context_table_degrades_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0})],
            )
            .await
            .expect("Write should succeed");

        let config = ForgeConfig::default().with_data_dir(temp_dir.path());
        let prompts =
            PromptLibrary::new().with_association(EntityKind::Room, vec![EntityKind::Hotel]);
        let pipeline = ForgePipeline::with_library(
            config,
            prompts,
            FixedProvider::new(r#"{"id": 1, "hotel_id": 4, "price": 85.0, "capacity": 3}"#),
        );

        let completed = pipeline
            .complete_record(EntityKind::Room, 1)
            .await
            .expect("Completion should succeed without the context table");
        assert_eq!(completed.id(), 1);
    }

    #[tokio::test]
    async fn test_complete_batch_skips_real_records_and_sorts_output() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[
                    json!({"id": 3, "hotel_id": 0, "price": 0.0, "capacity": 0}),
                    json!({"id": 2, "hotel_id": 5, "price": 150.0, "capacity": 4}),
                    json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0}),
                ],
            )
            .await
            .expect("Write should succeed");

        let pipeline = pipeline_with(
            &temp_dir,
            r#"{"id": 42, "hotel_id": 1, "price": 99.0, "capacity": 2}"#,
        );
        let outcome = pipeline
            .complete_batch(EntityKind::Room)
            .await
            .expect("Batch should succeed");

        let ids: Vec<i64> = outcome.completed.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_complete_batch_reports_failures_without_aborting() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[
                    json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0}),
                    json!({"id": 2, "hotel_id": 0, "price": 0.0, "capacity": 0}),
                ],
            )
            .await
            .expect("Write should succeed");

        let pipeline = pipeline_with(&temp_dir, "sorry, nothing structured in here");
        let outcome = pipeline
            .complete_batch(EntityKind::Room)
            .await
            .expect("Batch should succeed even when every record fails");

        assert!(outcome.completed.is_empty());
        let failed_ids: Vec<i64> = outcome.failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_persist_completed_merges_over_stored_table() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[
                    json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0}),
                    json!({"id": 2, "hotel_id": 5, "price": 150.0, "capacity": 4}),
                ],
            )
            .await
            .expect("Write should succeed");

        let completed = vec![EntityRecord::from_value(
            EntityKind::Room,
            json!({"id": 1, "hotel_id": 3, "price": 75.0, "capacity": 2}),
        )
        .expect("Record should validate")];

        let pipeline = pipeline_with(&temp_dir, "{}");
        pipeline
            .persist_completed(EntityKind::Room, &completed)
            .await
            .expect("Persist should succeed");

        let records = store
            .read_records(EntityKind::Room)
            .await
            .expect("Read should succeed");
        assert_eq!(records.len(), 2);
        let merged = records
            .iter()
            .find(|r| RecordStore::record_id(r) == Some(1))
            .expect("Row 1 should still exist");
        assert_eq!(merged["hotel_id"], json!(3));
        let untouched = records
            .iter()
            .find(|r| RecordStore::record_id(r) == Some(2))
            .expect("Row 2 should still exist");
        assert_eq!(untouched["price"], json!(150.0));
    }

    #[test]
    fn test_record_is_pending() {
        let placeholder = json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0});
        assert!(record_is_pending(EntityKind::Room, &placeholder));

        let real = json!({"id": 1, "hotel_id": 2, "price": 80.0, "capacity": 2});
        assert!(!record_is_pending(EntityKind::Room, &real));

        let partial = json!({"id": 1, "hotel_id": 2, "price": 80.0, "capacity": 0});
        assert!(record_is_pending(EntityKind::Room, &partial));

        let missing_field = json!({"id": 1, "hotel_id": 2, "price": 80.0});
        assert!(record_is_pending(EntityKind::Room, &missing_field));

        let hotel = json!({"id": 1, "name": "Hotel du Lac", "address": "1 quai Perdonnet", "tag": "city"});
        assert!(!record_is_pending(EntityKind::Hotel, &hotel));
    }
}
