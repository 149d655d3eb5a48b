//! Tools synthesized at registration time from a tabular store's tabs.
//!
//! Each tab (a title, a purpose and an ordered column list) yields five CRUD
//! tools whose input schemas are derived from its columns. A fixed set of
//! management tools edits the tabs themselves. Everything is re-derived on
//! every registration pass; a schema edit only becomes callable after the
//! session re-registers.

#![warn(missing_docs, clippy::pedantic)]

pub mod backend;
pub mod builder;
pub mod error;
pub mod fields;
pub mod management;
pub mod memory;
pub mod model;
pub mod tab_tools;

pub use backend::TabularBackend;
pub use builder::{GatedTools, TabularToolBuilder};
pub use error::{TabularError, TabularResult};
pub use fields::{FieldMap, ROW_NUMBER, tab_slugs};
pub use memory::InMemoryTabularBackend;
pub use model::{FieldValues, Row, RowPage, TabConfig};
