//! Core types for bandjoin: values, rows, calendar dates and the schema role
//! binding that tells the join algorithms where the key and timestamp live.

pub mod date;
pub mod row;
pub mod schema;
pub mod value;

pub use date::CalendarDate;
pub use row::{Row, RowValues};
pub use schema::{JoinSchema, RelationShape, RelationSlot, RoleBinding};
pub use value::Value;
