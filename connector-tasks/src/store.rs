//! The task store collaborator.

use async_trait::async_trait;
use connector_primitives::TaskId;

use crate::error::TaskResult;
use crate::model::ScrapeTask;

/// Where scrape tasks live between creation and fulfilment.
///
/// The fulfiller updates tasks out of band; through this trait the client
/// can only create and read them.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new pending task for `url` and returns it.
    async fn create_task(&self, url: &str) -> TaskResult<ScrapeTask>;

    /// Reads a task as stored. Never blocks on or mutates it.
    async fn get_task(&self, id: TaskId) -> TaskResult<Option<ScrapeTask>>;
}
