//! Index plan: field types, the schema and low-level architecture knobs.

pub mod architecture;
pub mod field_type;
pub mod schema;

pub use architecture::Architecture;
pub use field_type::FieldType;
pub use schema::Schema;
