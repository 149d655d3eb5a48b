//! Request/response pairs that complete out of band.
//!
//! A [`ScrapeTask`] is created by the [`AsyncTaskClient`], picked up and
//! resolved by an external fulfiller (a browser extension), and observed by
//! polling. The client never mutates a task after creating it.

#![warn(missing_docs, clippy::pedantic)]

pub mod client;
pub mod error;
pub mod memory;
pub mod model;
pub mod store;
pub mod tools;

pub use client::{AsyncTaskClient, WaitOptions};
pub use error::{TaskError, TaskResult};
pub use memory::InMemoryTaskStore;
pub use model::{ScrapeTask, TaskStatus};
pub use store::TaskStore;
pub use tools::ScrapeToolBuilder;
