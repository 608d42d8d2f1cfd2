//! Referential-integrity auditing over a record store.
//!
//! Read-only checks across all entity tables: duplicate ids, raw-shape and
//! tag violations, placeholder markers left behind after completion,
//! dangling foreign references and reservation date inversions. The write
//! paths never run these checks; auditing is a separate, explicit pass.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::schema::{EntityKind, FieldKind, INTEGER_SENTINEL};
use crate::store::RecordStore;

/// Foreign-key edges between entity tables: (referencing entity, field,
/// referenced entity).
const FOREIGN_KEYS: &[(EntityKind, &str, EntityKind)] = &[
    (EntityKind::Room, "hotel_id", EntityKind::Hotel),
    (EntityKind::RoomOption, "room_id", EntityKind::Room),
    (EntityKind::RoomOption, "option_id", EntityKind::Option),
    (EntityKind::HotelOption, "hotel_id", EntityKind::Hotel),
    (EntityKind::HotelOption, "option_id", EntityKind::Option),
    (EntityKind::StayOption, "stay_id", EntityKind::Reservation),
    (EntityKind::StayOption, "option_id", EntityKind::Option),
    (EntityKind::Reservation, "customer_id", EntityKind::Customer),
    (EntityKind::Reservation, "room_id", EntityKind::Room),
];

/// A single audit problem tied to an entity table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditFinding {
    /// Entity table the finding concerns.
    pub entity: String,
    /// Id of the offending record, when it carries one.
    pub id: Option<i64>,
    /// Description of the problem.
    pub message: String,
}

/// Result of auditing a record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Whether the store passes every integrity check.
    pub clean: bool,
    /// Integrity violations.
    pub errors: Vec<AuditFinding>,
    /// Non-fatal observations, such as records still pending completion.
    pub warnings: Vec<String>,
}

impl AuditReport {
    /// Creates a clean report with no findings.
    pub fn clean() -> Self {
        Self {
            clean: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an integrity violation to the report.
    pub fn add_error(&mut self, entity: &str, id: Option<i64>, message: impl Into<String>) {
        self.errors.push(AuditFinding {
            entity: entity.to_string(),
            id,
            message: message.into(),
        });
        self.clean = false;
    }

    /// Adds a non-fatal observation to the report.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Auditor for a whole record store.
pub struct StoreAudit;

impl StoreAudit {
    /// Audits every entity table in the store.
    ///
    /// Missing table files count as empty. A malformed table file becomes
    /// an error finding rather than failing the audit, so the remaining
    /// tables are still checked.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for IO failures.
    pub async fn run(store: &RecordStore) -> Result<AuditReport, StoreError> {
        let mut report = AuditReport::clean();
        let mut tables: HashMap<EntityKind, Vec<Value>> = HashMap::new();

        for kind in EntityKind::all() {
            let records = match store.read_records_or_default(kind).await {
                Ok(records) => records,
                Err(StoreError::InvalidFormat { path, reason }) => {
                    report.add_error(
                        kind.as_str(),
                        None,
                        format!("table file {path} is unreadable: {reason}"),
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            tables.insert(kind, records);
        }

        for kind in EntityKind::all() {
            Self::check_table(kind, &tables[&kind], &mut report);
        }
        Self::check_references(&tables, &mut report);
        Self::check_reservation_dates(&tables[&EntityKind::Reservation], &mut report);

        info!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "store audit finished"
        );
        Ok(report)
    }

    /// Per-table checks: id uniqueness, raw field shapes, tag membership
    /// and leftover placeholder markers.
    fn check_table(kind: EntityKind, records: &[Value], report: &mut AuditReport) {
        let entity = kind.as_str();

        let mut id_counts: HashMap<i64, usize> = HashMap::new();
        for record in records {
            match RecordStore::record_id(record) {
                Some(id) => *id_counts.entry(id).or_insert(0) += 1,
                None => report.add_error(entity, None, "record without an integer id"),
            }
        }
        let mut duplicates: Vec<(i64, usize)> = id_counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .collect();
        duplicates.sort_by_key(|&(id, _)| id);
        for (id, count) in duplicates {
            report.add_error(entity, Some(id), format!("id appears {count} times"));
        }

        let descriptor = kind.descriptor();
        for record in records {
            let id = RecordStore::record_id(record);
            let mut pending_fields: Vec<&str> = Vec::new();

            for field in descriptor.fields {
                let Some(value) = record.get(field.name) else {
                    report.add_error(entity, id, format!("missing field '{}'", field.name));
                    continue;
                };

                match field.kind {
                    FieldKind::Id => {}
                    FieldKind::Text => {
                        if !value.is_string() {
                            report.add_error(
                                entity,
                                id,
                                format!("field '{}' is not a string", field.name),
                            );
                        }
                    }
                    FieldKind::Integer => {
                        if value.as_i64().is_none() {
                            report.add_error(
                                entity,
                                id,
                                format!("field '{}' is not an integer", field.name),
                            );
                        }
                    }
                    FieldKind::Float => {
                        if value.as_f64().is_none() {
                            report.add_error(
                                entity,
                                id,
                                format!("field '{}' is not a number", field.name),
                            );
                        }
                    }
                    FieldKind::Date => match value.as_str() {
                        Some(text) => {
                            if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
                                report.add_error(
                                    entity,
                                    id,
                                    format!("field '{}' is not a date: '{text}'", field.name),
                                );
                            }
                        }
                        None => report.add_error(
                            entity,
                            id,
                            format!("field '{}' is not a string date", field.name),
                        ),
                    },
                    FieldKind::Tag(allowed) => match value.as_str() {
                        Some(tag) if allowed.contains(&tag) => {}
                        Some(tag) => report.add_error(
                            entity,
                            id,
                            format!("tag '{tag}' is outside the allowed set {allowed:?}"),
                        ),
                        None => report.add_error(
                            entity,
                            id,
                            format!("field '{}' is not a string tag", field.name),
                        ),
                    },
                }

                if field.kind.is_placeholder(value) {
                    pending_fields.push(field.name);
                }
            }

            if !pending_fields.is_empty() {
                report.add_warning(format!(
                    "{entity} {} still carries placeholder values: {}",
                    id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                    pending_fields.join(", ")
                ));
            }
        }
    }

    /// Cross-table checks: every non-sentinel foreign key must resolve to
    /// a stored id. A sentinel foreign key counts as pending, not dangling.
    fn check_references(tables: &HashMap<EntityKind, Vec<Value>>, report: &mut AuditReport) {
        let mut id_sets: HashMap<EntityKind, HashSet<i64>> = HashMap::new();
        for (&kind, records) in tables {
            id_sets.insert(
                kind,
                records.iter().filter_map(RecordStore::record_id).collect(),
            );
        }

        for &(kind, field, target) in FOREIGN_KEYS {
            let Some(records) = tables.get(&kind) else {
                continue;
            };
            for record in records {
                let Some(reference) = record.get(field).and_then(Value::as_i64) else {
                    continue;
                };
                if reference == INTEGER_SENTINEL {
                    continue;
                }
                if !id_sets[&target].contains(&reference) {
                    report.add_error(
                        kind.as_str(),
                        RecordStore::record_id(record),
                        format!(
                            "{field} {reference} does not match any stored {}",
                            target.as_str()
                        ),
                    );
                }
            }
        }
    }

    /// Every reservation must end on or after the day it starts.
    fn check_reservation_dates(records: &[Value], report: &mut AuditReport) {
        for record in records {
            let (Some(start), Some(end)) = (
                parse_date_field(record, "start_date"),
                parse_date_field(record, "end_date"),
            ) else {
                continue;
            };
            if end < start {
                report.add_error(
                    EntityKind::Reservation.as_str(),
                    RecordStore::record_id(record),
                    format!("stay ends before it starts ({start} to {end})"),
                );
            }
        }
    }
}

fn parse_date_field(record: &Value, field: &str) -> Option<NaiveDate> {
    record
        .get(field)
        .and_then(Value::as_str)
        .and_then(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn seeded_store(temp_dir: &TempDir) -> RecordStore {
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Hotel,
                &[json!({"id": 1, "name": "Hotel du Lac", "address": "1 quai Perdonnet", "tag": "city"})],
            )
            .await
            .expect("Write should succeed");
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 1, "hotel_id": 1, "price": 120.0, "capacity": 2})],
            )
            .await
            .expect("Write should succeed");
        store
            .write_records(
                EntityKind::Customer,
                &[json!({"id": 1, "name": "Nora Fell", "email": "nora@example.com"})],
            )
            .await
            .expect("Write should succeed");
        store
            .write_records(
                EntityKind::Reservation,
                &[json!({
                    "id": 1, "customer_id": 1, "room_id": 1,
                    "start_date": "2026-07-01", "end_date": "2026-07-08"
                })],
            )
            .await
            .expect("Write should succeed");
        store
    }

    #[tokio::test]
    async fn test_consistent_store_is_clean() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = seeded_store(&temp_dir).await;
        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(report.clean, "unexpected findings: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_is_clean() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(report.clean);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Hotel,
                &[
                    json!({"id": 1, "name": "A", "address": "a", "tag": "city"}),
                    json!({"id": 1, "name": "B", "address": "b", "tag": "beach"}),
                ],
            )
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(!report.clean);
        assert!(report
            .errors
            .iter()
            .any(|f| f.entity == "hotel" && f.id == Some(1) && f.message.contains("2 times")));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Hotel,
                &[json!({"id": 1, "name": "A", "address": "a", "tag": "volcano"})],
            )
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(report
            .errors
            .iter()
            .any(|f| f.entity == "hotel" && f.message.contains("volcano")));
    }

    #[tokio::test]
    async fn test_dangling_foreign_key_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 1, "hotel_id": 9, "price": 80.0, "capacity": 2})],
            )
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(report
            .errors
            .iter()
            .any(|f| f.entity == "room" && f.message.contains("hotel_id 9")));
    }

    #[tokio::test]
    async fn test_sentinel_foreign_key_warns_instead_of_dangling() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        store
            .write_records(
                EntityKind::Room,
                &[json!({"id": 1, "hotel_id": 0, "price": 0.0, "capacity": 0})],
            )
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(
            !report.errors.iter().any(|f| f.message.contains("hotel_id")),
            "sentinel reference should not count as dangling: {:?}",
            report.errors
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("placeholder values")));
    }

    #[tokio::test]
    async fn test_reservation_date_inversion_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = seeded_store(&temp_dir).await;
        store
            .write_records(
                EntityKind::Reservation,
                &[json!({
                    "id": 1, "customer_id": 1, "room_id": 1,
                    "start_date": "2026-07-08", "end_date": "2026-07-01"
                })],
            )
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(report
            .errors
            .iter()
            .any(|f| f.entity == "reservation" && f.message.contains("ends before it starts")));
    }

    #[tokio::test]
    async fn test_malformed_table_becomes_finding() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::new(temp_dir.path());
        tokio::fs::write(temp_dir.path().join("hotels.json"), "{broken")
            .await
            .expect("Write should succeed");

        let report = StoreAudit::run(&store).await.expect("Audit should succeed");
        assert!(!report.clean);
        assert!(report
            .errors
            .iter()
            .any(|f| f.entity == "hotel" && f.message.contains("unreadable")));
    }
}
