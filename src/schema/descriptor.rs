//! Entity selector and static field-descriptor tables.
//!
//! Each entity declares its fields exactly once in a const table. The
//! placeholder generator, prompt builders and audit walk these tables instead
//! of inspecting record values, so adding a field is a one-line change here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Closed set of hotel category tags.
pub const HOTEL_TAGS: &[&str] = &["mountain", "city", "beach", "countryside"];

/// Closed set of option applicability tags.
pub const OPTION_TAGS: &[&str] = &["hotel", "room", "stay"];

/// Marker carried by text fields awaiting completion.
pub const TEXT_SENTINEL: &str = "to be completed";

/// Marker carried by integer fields (including foreign references) awaiting completion.
pub const INTEGER_SENTINEL: i64 = 0;

/// Marker carried by float fields awaiting completion.
pub const FLOAT_SENTINEL: f64 = 0.0;

/// Marker carried by date fields awaiting completion.
pub const DATE_SENTINEL: &str = "1970-01-01";

/// The kind of a schema field.
///
/// Drives placeholder synthesis (which marker, if any, the field starts
/// with) and JSON-schema rendering for structured-output requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The record's own identifier. Assigned sequentially, never marked.
    Id,
    /// Free-form text.
    Text,
    /// Whole number, including foreign references.
    Integer,
    /// Decimal number.
    Float,
    /// Calendar date, serialized as YYYY-MM-DD.
    Date,
    /// Closed enumeration over the listed values.
    Tag(&'static [&'static str]),
}

impl FieldKind {
    /// Returns the marker a freshly generated placeholder carries for this
    /// kind, or `None` for fields that are populated at generation time
    /// (identifiers and tags).
    pub fn placeholder_value(&self) -> Option<Value> {
        match self {
            FieldKind::Id | FieldKind::Tag(_) => None,
            FieldKind::Text => Some(Value::String(TEXT_SENTINEL.to_string())),
            FieldKind::Integer => Some(json!(INTEGER_SENTINEL)),
            FieldKind::Float => Some(json!(FLOAT_SENTINEL)),
            FieldKind::Date => Some(Value::String(DATE_SENTINEL.to_string())),
        }
    }

    /// Returns true when `value` is this kind's placeholder marker.
    pub fn is_placeholder(&self, value: &Value) -> bool {
        match self {
            FieldKind::Id | FieldKind::Tag(_) => false,
            FieldKind::Text => value.as_str() == Some(TEXT_SENTINEL),
            FieldKind::Integer => value.as_i64() == Some(INTEGER_SENTINEL),
            FieldKind::Float => value.as_f64() == Some(FLOAT_SENTINEL),
            FieldKind::Date => value.as_str() == Some(DATE_SENTINEL),
        }
    }

    fn schema_fragment(&self) -> Value {
        match self {
            FieldKind::Id | FieldKind::Integer => json!({"type": "integer"}),
            FieldKind::Text => json!({"type": "string"}),
            FieldKind::Float => json!({"type": "number"}),
            FieldKind::Date => json!({"type": "string", "format": "date"}),
            FieldKind::Tag(values) => json!({"type": "string", "enum": values}),
        }
    }
}

/// A single field declaration.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Static field table for one entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Entity name as it appears in prompt and association configuration.
    pub name: &'static str,
    /// Stem of the entity's record file, without the `.json` extension.
    pub file_stem: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl EntityDescriptor {
    /// Looks up a field declaration by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Renders this entity as a JSON-schema object suitable for a
    /// structured-output `response_format`.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in self.fields {
            properties.insert(field.name.to_string(), field.kind.schema_fragment());
            required.push(Value::String(field.name.to_string()));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Renders the schema for a batch of this entity, wrapped in a `records`
    /// envelope so the root stays an object as structured output requires.
    pub fn batch_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"records": {"type": "array", "items": self.json_schema()}},
            "required": ["records"],
            "additionalProperties": false,
        })
    }
}

const HOTEL: EntityDescriptor = EntityDescriptor {
    name: "hotel",
    file_stem: "hotels",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "name", kind: FieldKind::Text },
        FieldDescriptor { name: "address", kind: FieldKind::Text },
        FieldDescriptor { name: "tag", kind: FieldKind::Tag(HOTEL_TAGS) },
    ],
};

const ROOM: EntityDescriptor = EntityDescriptor {
    name: "room",
    file_stem: "rooms",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "hotel_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "price", kind: FieldKind::Float },
        FieldDescriptor { name: "capacity", kind: FieldKind::Integer },
    ],
};

const OPTION: EntityDescriptor = EntityDescriptor {
    name: "option",
    file_stem: "options",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "name", kind: FieldKind::Text },
        FieldDescriptor { name: "tag", kind: FieldKind::Tag(OPTION_TAGS) },
        FieldDescriptor { name: "price", kind: FieldKind::Float },
    ],
};

const ROOM_OPTION: EntityDescriptor = EntityDescriptor {
    name: "room_option",
    file_stem: "room_options",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "room_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "option_id", kind: FieldKind::Integer },
    ],
};

const HOTEL_OPTION: EntityDescriptor = EntityDescriptor {
    name: "hotel_option",
    file_stem: "hotel_options",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "hotel_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "option_id", kind: FieldKind::Integer },
    ],
};

const STAY_OPTION: EntityDescriptor = EntityDescriptor {
    name: "stay_option",
    file_stem: "stay_options",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "stay_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "option_id", kind: FieldKind::Integer },
    ],
};

const CUSTOMER: EntityDescriptor = EntityDescriptor {
    name: "customer",
    file_stem: "customers",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "name", kind: FieldKind::Text },
        FieldDescriptor { name: "email", kind: FieldKind::Text },
    ],
};

const RESERVATION: EntityDescriptor = EntityDescriptor {
    name: "reservation",
    file_stem: "reservations",
    fields: &[
        FieldDescriptor { name: "id", kind: FieldKind::Id },
        FieldDescriptor { name: "customer_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "room_id", kind: FieldKind::Integer },
        FieldDescriptor { name: "start_date", kind: FieldKind::Date },
        FieldDescriptor { name: "end_date", kind: FieldKind::Date },
    ],
};

/// Selector over the record types in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Hotel,
    Room,
    Option,
    RoomOption,
    HotelOption,
    StayOption,
    Customer,
    Reservation,
}

impl EntityKind {
    /// Returns all entity kinds, in dependency-friendly order (parents
    /// before the records that reference them).
    pub fn all() -> Vec<EntityKind> {
        vec![
            EntityKind::Hotel,
            EntityKind::Room,
            EntityKind::Option,
            EntityKind::RoomOption,
            EntityKind::HotelOption,
            EntityKind::StayOption,
            EntityKind::Customer,
            EntityKind::Reservation,
        ]
    }

    /// Returns the static field table for this entity.
    pub fn descriptor(&self) -> &'static EntityDescriptor {
        match self {
            EntityKind::Hotel => &HOTEL,
            EntityKind::Room => &ROOM,
            EntityKind::Option => &OPTION,
            EntityKind::RoomOption => &ROOM_OPTION,
            EntityKind::HotelOption => &HOTEL_OPTION,
            EntityKind::StayOption => &STAY_OPTION,
            EntityKind::Customer => &CUSTOMER,
            EntityKind::Reservation => &RESERVATION,
        }
    }

    /// Returns the entity name used in configuration files and prompts.
    pub fn as_str(&self) -> &'static str {
        self.descriptor().name
    }

    /// Returns the stem of the entity's record file.
    pub fn file_stem(&self) -> &'static str {
        self.descriptor().file_stem
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all()
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownEntity(s.to_string()))
    }
}
