//! The agent-facing tool contract.
//!
//! Every callable action, whether derived from a manifest, synthesized for a
//! tabular store, or written by hand, ends up as a [`ToolHandle`] inside a
//! per-session [`ToolRegistry`]. Invoking a tool always yields a
//! [`ToolOutput`]: a short text block plus an explicit error flag.

#![warn(missing_docs, clippy::pedantic)]

pub mod args;
pub mod builder;
pub mod error;
pub mod registry;
pub mod schema;

pub use builder::{SessionContext, ToolBuilder, Withheld};
pub use error::{ToolError, ToolResult};
pub use registry::{Tool, ToolHandle, ToolMetadata, ToolOutput, ToolRegistry};
pub use schema::{ObjectSchema, Property};
