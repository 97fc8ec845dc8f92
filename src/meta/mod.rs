//! Metadata model: tables, columns, references and schema documents.

pub mod column;
pub mod schema;
pub mod table;

pub use column::{Column, Reference};
pub use schema::Schema;
pub use table::{is_identifier, Table};
