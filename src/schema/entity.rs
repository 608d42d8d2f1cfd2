//! Typed entity records with validation on construction.
//!
//! Every constructor runs the same checks `validate` performs, so a record
//! that exists in memory already satisfies its schema constraints. Foreign
//! references are deliberately not checked against the store here; that is
//! the audit module's job.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::descriptor::EntityKind;

/// Maximum length of an option name, in characters.
const OPTION_NAME_MAX: usize = 50;

/// Maximum length of a customer name, in characters.
const CUSTOMER_NAME_MAX: usize = 100;

/// Hotel category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotelTag {
    Mountain,
    City,
    Beach,
    Countryside,
}

impl HotelTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotelTag::Mountain => "mountain",
            HotelTag::City => "city",
            HotelTag::Beach => "beach",
            HotelTag::Countryside => "countryside",
        }
    }
}

impl fmt::Display for HotelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotelTag {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mountain" => Ok(HotelTag::Mountain),
            "city" => Ok(HotelTag::City),
            "beach" => Ok(HotelTag::Beach),
            "countryside" => Ok(HotelTag::Countryside),
            other => Err(SchemaError::InvalidTag {
                entity: "hotel",
                field: "tag",
                value: other.to_string(),
            }),
        }
    }
}

/// Option applicability tag: what the option attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionTag {
    Hotel,
    Room,
    Stay,
}

impl OptionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionTag::Hotel => "hotel",
            OptionTag::Room => "room",
            OptionTag::Stay => "stay",
        }
    }
}

impl fmt::Display for OptionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionTag {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hotel" => Ok(OptionTag::Hotel),
            "room" => Ok(OptionTag::Room),
            "stay" => Ok(OptionTag::Stay),
            other => Err(SchemaError::InvalidTag {
                entity: "option",
                field: "tag",
                value: other.to_string(),
            }),
        }
    }
}

/// A hotel property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub tag: HotelTag,
}

impl Hotel {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        address: impl Into<String>,
        tag: HotelTag,
    ) -> Result<Self, SchemaError> {
        let hotel = Self {
            id,
            name: name.into(),
            address: address.into(),
            tag,
        };
        hotel.validate()?;
        Ok(hotel)
    }

    /// The tag constraint is carried by the `HotelTag` type; nothing else is
    /// constrained.
    pub fn validate(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// A bookable room belonging to a hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub hotel_id: i64,
    pub price: f64,
    pub capacity: i64,
}

impl Room {
    pub fn new(id: i64, hotel_id: i64, price: f64, capacity: i64) -> Result<Self, SchemaError> {
        let room = Self {
            id,
            hotel_id,
            price,
            capacity,
        };
        room.validate()?;
        Ok(room)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.price <= 0.0 {
            return Err(SchemaError::InvalidField {
                entity: "room",
                field: "price",
                reason: format!("nightly price must be positive, got {}", self.price),
            });
        }
        if self.capacity < 1 {
            return Err(SchemaError::InvalidField {
                entity: "room",
                field: "capacity",
                reason: format!("capacity must be at least 1, got {}", self.capacity),
            });
        }
        Ok(())
    }
}

/// A bookable extra (breakfast, spa access, late checkout).
///
/// Named `ServiceOption` to avoid shadowing `std::option::Option`; the
/// entity itself is called "option" everywhere data and prompts are
/// concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOption {
    pub id: i64,
    pub name: String,
    pub tag: OptionTag,
    pub price: f64,
}

impl ServiceOption {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        tag: OptionTag,
        price: f64,
    ) -> Result<Self, SchemaError> {
        let option = Self {
            id,
            name: name.into(),
            tag,
            price,
        };
        option.validate()?;
        Ok(option)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.chars().count() > OPTION_NAME_MAX {
            return Err(SchemaError::InvalidField {
                entity: "option",
                field: "name",
                reason: format!("name exceeds {OPTION_NAME_MAX} characters"),
            });
        }
        if self.price < 0.0 {
            return Err(SchemaError::InvalidField {
                entity: "option",
                field: "price",
                reason: format!("price must be non-negative, got {}", self.price),
            });
        }
        Ok(())
    }
}

/// Association between a room and an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomOption {
    pub id: i64,
    pub room_id: i64,
    pub option_id: i64,
}

impl RoomOption {
    pub fn new(id: i64, room_id: i64, option_id: i64) -> Result<Self, SchemaError> {
        let record = Self {
            id,
            room_id,
            option_id,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Association between a hotel and an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOption {
    pub id: i64,
    pub hotel_id: i64,
    pub option_id: i64,
}

impl HotelOption {
    pub fn new(id: i64, hotel_id: i64, option_id: i64) -> Result<Self, SchemaError> {
        let record = Self {
            id,
            hotel_id,
            option_id,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Association between a stay and an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayOption {
    pub id: i64,
    pub stay_id: i64,
    pub option_id: i64,
}

impl StayOption {
    pub fn new(id: i64, stay_id: i64, option_id: i64) -> Result<Self, SchemaError> {
        let record = Self {
            id,
            stay_id,
            option_id,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// A customer identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl Customer {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let customer = Self {
            id,
            name: name.into(),
            email: email.into(),
        };
        customer.validate()?;
        Ok(customer)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.chars().count() > CUSTOMER_NAME_MAX {
            return Err(SchemaError::InvalidField {
                entity: "customer",
                field: "name",
                reason: format!("name exceeds {CUSTOMER_NAME_MAX} characters"),
            });
        }
        Ok(())
    }
}

/// A room reservation by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub customer_id: i64,
    pub room_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Reservation {
    pub fn new(
        id: i64,
        customer_id: i64,
        room_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, SchemaError> {
        let reservation = Self {
            id,
            customer_id,
            room_id,
            start_date,
            end_date,
        };
        reservation.validate()?;
        Ok(reservation)
    }

    /// Date ordering (end before start) is not a construction constraint;
    /// the audit module reports inversions instead.
    pub fn validate(&self) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// A record of any entity type.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Hotel(Hotel),
    Room(Room),
    Option(ServiceOption),
    RoomOption(RoomOption),
    HotelOption(HotelOption),
    StayOption(StayOption),
    Customer(Customer),
    Reservation(Reservation),
}

impl EntityRecord {
    /// Parses and validates a raw JSON object as the given entity.
    ///
    /// Unknown payload fields are dropped; missing or ill-typed fields fail
    /// with a `MalformedPayload` carrying the serde error.
    pub fn from_value(kind: EntityKind, value: Value) -> Result<Self, SchemaError> {
        let entity = kind.as_str();
        let malformed = |source| SchemaError::MalformedPayload { entity, source };
        let record = match kind {
            EntityKind::Hotel => {
                EntityRecord::Hotel(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::Room => {
                EntityRecord::Room(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::Option => {
                EntityRecord::Option(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::RoomOption => {
                EntityRecord::RoomOption(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::HotelOption => {
                EntityRecord::HotelOption(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::StayOption => {
                EntityRecord::StayOption(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::Customer => {
                EntityRecord::Customer(serde_json::from_value(value).map_err(malformed)?)
            }
            EntityKind::Reservation => {
                EntityRecord::Reservation(serde_json::from_value(value).map_err(malformed)?)
            }
        };
        record.validate()?;
        Ok(record)
    }

    /// Serializes the record back to a raw JSON object.
    pub fn to_value(&self) -> Result<Value, SchemaError> {
        let value = match self {
            EntityRecord::Hotel(r) => serde_json::to_value(r)?,
            EntityRecord::Room(r) => serde_json::to_value(r)?,
            EntityRecord::Option(r) => serde_json::to_value(r)?,
            EntityRecord::RoomOption(r) => serde_json::to_value(r)?,
            EntityRecord::HotelOption(r) => serde_json::to_value(r)?,
            EntityRecord::StayOption(r) => serde_json::to_value(r)?,
            EntityRecord::Customer(r) => serde_json::to_value(r)?,
            EntityRecord::Reservation(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Hotel(_) => EntityKind::Hotel,
            EntityRecord::Room(_) => EntityKind::Room,
            EntityRecord::Option(_) => EntityKind::Option,
            EntityRecord::RoomOption(_) => EntityKind::RoomOption,
            EntityRecord::HotelOption(_) => EntityKind::HotelOption,
            EntityRecord::StayOption(_) => EntityKind::StayOption,
            EntityRecord::Customer(_) => EntityKind::Customer,
            EntityRecord::Reservation(_) => EntityKind::Reservation,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            EntityRecord::Hotel(r) => r.id,
            EntityRecord::Room(r) => r.id,
            EntityRecord::Option(r) => r.id,
            EntityRecord::RoomOption(r) => r.id,
            EntityRecord::HotelOption(r) => r.id,
            EntityRecord::StayOption(r) => r.id,
            EntityRecord::Customer(r) => r.id,
            EntityRecord::Reservation(r) => r.id,
        }
    }

    /// Overwrites the record's identifier. The completion pipeline uses this
    /// to re-pin the id it asked for, whatever the endpoint returned.
    pub fn set_id(&mut self, id: i64) {
        match self {
            EntityRecord::Hotel(r) => r.id = id,
            EntityRecord::Room(r) => r.id = id,
            EntityRecord::Option(r) => r.id = id,
            EntityRecord::RoomOption(r) => r.id = id,
            EntityRecord::HotelOption(r) => r.id = id,
            EntityRecord::StayOption(r) => r.id = id,
            EntityRecord::Customer(r) => r.id = id,
            EntityRecord::Reservation(r) => r.id = id,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            EntityRecord::Hotel(r) => r.validate(),
            EntityRecord::Room(r) => r.validate(),
            EntityRecord::Option(r) => r.validate(),
            EntityRecord::RoomOption(r) => r.validate(),
            EntityRecord::HotelOption(r) => r.validate(),
            EntityRecord::StayOption(r) => r.validate(),
            EntityRecord::Customer(r) => r.validate(),
            EntityRecord::Reservation(r) => r.validate(),
        }
    }
}
