//! Schema registry for the booking domain.
//!
//! Eight record types, their field tables and their construction-time
//! constraints. Purely declarative; the registry performs no IO.

mod descriptor;
mod entity;

pub use descriptor::{
    EntityDescriptor, EntityKind, FieldDescriptor, FieldKind, DATE_SENTINEL, FLOAT_SENTINEL,
    HOTEL_TAGS, INTEGER_SENTINEL, OPTION_TAGS, TEXT_SENTINEL,
};
pub use entity::{
    Customer, EntityRecord, Hotel, HotelOption, HotelTag, OptionTag, Reservation, Room,
    RoomOption, ServiceOption, StayOption,
};
