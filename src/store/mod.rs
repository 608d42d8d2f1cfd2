//! Record store: one JSON list file per entity.
//!
//! Tables live under a data directory as pretty-printed JSON arrays
//! (`hotels.json`, `rooms.json`, ...). Reads parse the whole file; writes
//! replace it wholesale. There is no locking and no partial-write recovery;
//! the store is an offline batch artifact, not a database.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;
use crate::schema::EntityKind;

/// File-based store for entity record tables.
pub struct RecordStore {
    /// Directory holding one `<entity>.json` file per entity.
    base_path: PathBuf,
}

impl RecordStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the file path of an entity's record table.
    pub fn record_path(&self, kind: EntityKind) -> PathBuf {
        self.base_path.join(format!("{}.json", kind.file_stem()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn ensure_directory(&self) -> Result<(), StoreError> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                StoreError::DirectoryCreationFailed(format!(
                    "{}: {}",
                    self.base_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Reads an entity's table.
    ///
    /// Fails with `NotFound` when the file is absent and `InvalidFormat`
    /// when its content is not a JSON array.
    pub async fn read_records(&self, kind: EntityKind) -> Result<Vec<Value>, StoreError> {
        let path = self.record_path(kind);
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(&path).await?;
        let value: Value =
            serde_json::from_str(&contents).map_err(|e| StoreError::InvalidFormat {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        match value {
            Value::Array(records) => Ok(records),
            other => Err(StoreError::InvalidFormat {
                path: path.display().to_string(),
                reason: format!("expected a JSON array, got {}", json_type_name(&other)),
            }),
        }
    }

    /// Reads an entity's table, treating a missing file as an empty table.
    ///
    /// Malformed content still fails; only absence degrades.
    pub async fn read_records_or_default(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<Value>, StoreError> {
        match self.read_records(kind).await {
            Ok(records) => Ok(records),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Replaces an entity's table wholesale and returns the file path.
    pub async fn write_records(
        &self,
        kind: EntityKind,
        records: &[Value],
    ) -> Result<PathBuf, StoreError> {
        self.ensure_directory().await?;

        let path = self.record_path(kind);
        let json = serde_json::to_string_pretty(records)?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        debug!(
            entity = %kind,
            count = records.len(),
            path = %path.display(),
            "wrote record table"
        );
        Ok(path)
    }

    /// Appends records to an entity's table, keeping existing rows, and
    /// returns the new table size.
    pub async fn append_records(
        &self,
        kind: EntityKind,
        new_records: &[Value],
    ) -> Result<usize, StoreError> {
        let mut records = self.read_records_or_default(kind).await?;
        records.extend_from_slice(new_records);
        let total = records.len();
        self.write_records(kind, &records).await?;
        Ok(total)
    }

    /// Finds a record by id in an entity's table.
    ///
    /// A missing table is an error; a missing id is `Ok(None)`.
    pub async fn find_record(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<Value>, StoreError> {
        let records = self.read_records(kind).await?;
        Ok(records
            .into_iter()
            .find(|record| Self::record_id(record) == Some(id)))
    }

    /// Returns a raw record's id field, if present and integral.
    pub fn record_id(record: &Value) -> Option<i64> {
        record.get("id").and_then(Value::as_i64)
    }

    /// Returns the largest id in a record list, or 0 when none carry one.
    pub fn max_id(records: &[Value]) -> i64 {
        records
            .iter()
            .filter_map(Self::record_id)
            .max()
            .unwrap_or(0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
