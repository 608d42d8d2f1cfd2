//! Placeholder record generation.
//!
//! Builds partial records for later completion: sequential ids continuing
//! from the highest id already stored, a concrete tag sampled uniformly
//! from each closed tag set, and the typed sentinel for every other field.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::schema::{EntityKind, FieldKind};
use crate::store::RecordStore;

/// Generator for placeholder record batches.
///
/// Tag sampling is reproducible when a seed is set; otherwise the
/// generator draws from the OS.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderGenerator {
    seed: Option<u64>,
}

impl PlaceholderGenerator {
    /// Creates a non-deterministic generator.
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Sets a random seed for reproducible tag sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generates `n` placeholder records for an entity.
    ///
    /// Ids continue from the highest id in `existing`, strictly increasing
    /// and gap free. `n` of zero yields an empty batch; a negative `n`
    /// fails with `InvalidCount`.
    pub fn generate(
        &self,
        kind: EntityKind,
        n: i64,
        existing: &[Value],
    ) -> Result<Vec<Value>, PipelineError> {
        if n < 0 {
            return Err(PipelineError::InvalidCount(n));
        }

        let descriptor = kind.descriptor();
        let start_id = RecordStore::max_id(existing) + 1;
        let mut rng = self.create_rng();

        let mut records = Vec::with_capacity(n as usize);
        for offset in 0..n {
            let mut fields = Map::new();
            for field in descriptor.fields {
                let value = match field.kind {
                    FieldKind::Id => Value::from(start_id + offset),
                    FieldKind::Tag(allowed) => {
                        Value::from(allowed[rng.random_range(0..allowed.len())])
                    }
                    _ => field.kind.placeholder_value().unwrap_or(Value::Null),
                };
                fields.insert(field.name.to_string(), value);
            }
            records.push(Value::Object(fields));
        }

        Ok(records)
    }

    fn create_rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}
